use crate::error::ZapError;
use crate::types::{encode_id, is_null, read_id};
use alkanes_support::id::AlkaneId;
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initialized { router: AlkaneId },
}

/// Write-once configuration: the AMM router the zap talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapConfig {
    state: InitState,
}

impl ZapConfig {
    pub fn new() -> Self {
        Self {
            state: InitState::Uninitialized,
        }
    }

    /// Rebuild from persisted storage.
    pub fn restore(router: Option<AlkaneId>) -> Self {
        match router {
            Some(router) => Self {
                state: InitState::Initialized { router },
            },
            None => Self::new(),
        }
    }

    /// Decode the stored router slot; an empty slot means not initialized.
    pub fn from_storage(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::new());
        }
        Ok(Self::restore(Some(read_id(bytes, 0)?)))
    }

    pub fn to_storage(&self) -> Vec<u8> {
        match self.state {
            InitState::Initialized { router } => encode_id(&router),
            InitState::Uninitialized => Vec::new(),
        }
    }

    /// Succeeds exactly once. A failed call leaves the configuration as it was.
    pub fn initialize(&mut self, router: AlkaneId) -> Result<()> {
        if self.is_initialized() {
            return Err(ZapError::AlreadyInitialized.into());
        }
        if is_null(&router) {
            return Err(ZapError::InvalidRouter.into());
        }
        self.state = InitState::Initialized { router };
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, InitState::Initialized { .. })
    }

    pub fn state(&self) -> InitState {
        self.state
    }

    pub fn router(&self) -> Result<AlkaneId> {
        match self.state {
            InitState::Initialized { router } => Ok(router),
            InitState::Uninitialized => Err(ZapError::NotInitialized.into()),
        }
    }
}

impl Default for ZapConfig {
    fn default() -> Self {
        Self::new()
    }
}
