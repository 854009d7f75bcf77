use alkanes_runtime::{declare_alkane, message::MessageDispatch, runtime::AlkaneResponder};
use alkanes_support::{id::AlkaneId, response::CallResponse};
use anyhow::Result;
use metashrew_support::compat::to_arraybuffer_layout;

/// Console logging for contract code, compiled in only with `debug-log`.
#[macro_export]
macro_rules! zap_log {
    ($($arg:tt)*) => {{
        #[cfg(feature = "debug-log")]
        {
            alkanes_runtime::println!($($arg)*);
        }
        #[cfg(not(feature = "debug-log"))]
        {
            if false {
                let _ = format!($($arg)*);
            }
        }
    }};
}

pub mod alkanes_env;
pub mod amm_logic;
pub mod error;
pub mod fee;
pub mod gateway;
pub mod lifecycle;
pub mod orchestrator;
pub mod split;
pub mod types;

pub use alkanes_env::{AlkanesEnvironment, ParcelLedger};
pub use error::ZapError;
pub use fee::FeeModel;
pub use gateway::{AmmGateway, AssetGateway, AtomicScope, ZapEnvironment};
pub use lifecycle::{InitState, ZapConfig};
pub use orchestrator::{ZapOrchestrator, ZapStage};
pub use split::compute_split;
pub use types::{
    DepositResult, PoolReserves, SplitResult, ZapOutcome, ZapQuote, ZapRequest, BASIS_POINTS,
    DEFAULT_DEPOSIT_SLIPPAGE_BPS, DEFAULT_FEE_AMOUNT_PER_1000, DEFAULT_SWAP_SLIPPAGE_BPS,
    MINIMUM_LIQUIDITY, NULL_ID,
};

const ROUTER_KEY: &str = "/router";

#[derive(MessageDispatch)]
pub enum ZapInMessage {
    #[opcode(0)]
    InitializeZap { router: AlkaneId },
    #[opcode(1)]
    SingleTokenAddLiquidity {
        pair: AlkaneId,
        token: AlkaneId,
        amount: u128,
        to: AlkaneId,
        deadline: u128,
    },
    #[opcode(2)]
    GetZapQuote {
        pair: AlkaneId,
        token: AlkaneId,
        amount: u128,
    },
    #[opcode(3)]
    GetRouter {},
    #[opcode(50)]
    Forward {},
}

#[derive(Default)]
pub struct ZapIn();

impl AlkaneResponder for ZapIn {}

impl ZapIn {
    fn initialize_zap(&self, router: AlkaneId) -> Result<CallResponse> {
        let context = self.context()?;
        let mut config = self.config()?;
        config.initialize(router)?;
        self.observe_initialization()?;
        self.save_config(&config);
        zap_log!("zap-in: initialized with router {:?}", router);
        Ok(CallResponse::forward(&context.incoming_alkanes))
    }

    fn single_token_add_liquidity(
        &self,
        pair: AlkaneId,
        token: AlkaneId,
        amount: u128,
        to: AlkaneId,
        deadline: u128,
    ) -> Result<CallResponse> {
        let context = self.context()?;
        let orchestrator = ZapOrchestrator::from_config(&self.config()?)?;
        let request = ZapRequest::new(pair, token, amount, to, deadline);

        let mut env = AlkanesEnvironment::new(self, orchestrator.router, &context);
        let outcome = orchestrator.single_token_add_liquidity(&mut env, context.caller, &request)?;
        zap_log!("zap-in: ZapIn {}", hex::encode(outcome.encode()));

        let mut response = CallResponse::forward(&env.into_parcel());
        response.data = outcome.encode();
        Ok(response)
    }

    fn get_zap_quote(&self, pair: AlkaneId, token: AlkaneId, amount: u128) -> Result<CallResponse> {
        let context = self.context()?;
        let orchestrator = ZapOrchestrator::from_config(&self.config()?)?;
        let env = AlkanesEnvironment::new(self, orchestrator.router, &context);
        let quote = orchestrator.quote(&env, pair, token, amount)?;

        let mut response = CallResponse::forward(&context.incoming_alkanes);
        response.data = quote.encode();
        Ok(response)
    }

    fn get_router(&self) -> Result<CallResponse> {
        let context = self.context()?;
        let router = self.config()?.router()?;
        let mut response = CallResponse::forward(&context.incoming_alkanes);
        response.data = types::encode_id(&router);
        Ok(response)
    }

    fn forward(&self) -> Result<CallResponse> {
        let context = self.context()?;
        Ok(CallResponse::forward(&context.incoming_alkanes))
    }

    fn config(&self) -> Result<ZapConfig> {
        ZapConfig::from_storage(&self.load(ROUTER_KEY.as_bytes().to_vec()))
    }

    fn save_config(&self, config: &ZapConfig) {
        self.store(ROUTER_KEY.as_bytes().to_vec(), config.to_storage());
    }
}

declare_alkane! {
    impl AlkaneResponder for ZapIn {
        type Message = ZapInMessage;
    }
}
