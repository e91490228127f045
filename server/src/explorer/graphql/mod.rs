use async_graphql::{
    http::GraphiQLSource, ComplexObject, Context, EmptyMutation, EmptySubscription, Enum, Object,
    Schema, SimpleObject,
};
use async_graphql_poem::*;
use color_eyre::{eyre::eyre, Result};
use poem::{
    get, handler, listener::TcpListener, middleware::Cors, web::Html, Endpoint, EndpointExt,
    IntoResponse, Route, Server,
};
use tokio::{sync::OnceCell, task::JoinHandle};
use tracing::{info, instrument};

use ethql_primitives::{format_units, To0x, Unit as Denomination};

use super::{config::GraphqlConfig, state::StateSource};

mod errors;
mod scalars;

pub use errors::CoercionErrors;
pub use scalars::Address;

pub type AccountSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Upper bound on the number of addresses in one `accounts` query.
#[derive(Clone, Copy, Debug)]
struct BatchLimit(usize);

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Get account by address
    async fn account(&self, address: Address) -> Account {
        Account::new(address)
    }

    /// Get several accounts at once, in the order of `addresses`
    async fn accounts<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        addresses: Vec<Address>,
    ) -> Result<Vec<Account>> {
        let BatchLimit(limit) = *ctx.data::<BatchLimit>().map_err(|err| eyre!(err.message))?;

        if addresses.len() > limit {
            return Err(eyre!(
                "too many addresses: {} requested, at most {} allowed",
                addresses.len(),
                limit
            ));
        }

        Ok(addresses
            .into_iter()
            .map(Account::new)
            .collect())
    }
}

#[derive(SimpleObject)]
#[graphql(complex)]
pub struct Account {
    address: Address,
    #[graphql(skip)]
    code: OnceCell<Vec<u8>>,
}

impl Account {
    fn new(address: Address) -> Self {
        Self {
            address,
            code: OnceCell::new(),
        }
    }

    /// `code` and `type` share one read of the account code.
    async fn fetch_code<'ctx>(&self, ctx: &Context<'ctx>) -> Result<&[u8]> {
        let state = ctx.data::<StateSource>().map_err(|err| eyre!(err.message))?;

        let code = self
            .code
            .get_or_try_init(|| state.code(self.address.0))
            .await?;
        Ok(code.as_slice())
    }
}

#[ComplexObject]
impl Account {
    /// Balance in the requested unit, as a decimal string
    async fn balance<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        #[graphql(default)] unit: Unit,
    ) -> Result<String> {
        let state = ctx.data::<StateSource>().map_err(|err| eyre!(err.message))?;

        let balance = state.balance(self.address.0).await?;
        Ok(format_units(balance, unit.into())?)
    }

    /// Contract code as hex, `0x` for accounts without code
    async fn code<'ctx>(&self, ctx: &Context<'ctx>) -> Result<String> {
        Ok(self.fetch_code(ctx).await?.to_0x())
    }

    async fn transaction_count<'ctx>(&self, ctx: &Context<'ctx>) -> Result<u64> {
        let state = ctx.data::<StateSource>().map_err(|err| eyre!(err.message))?;

        state.transaction_count(self.address.0).await
    }

    #[graphql(name = "type")]
    async fn account_type<'ctx>(&self, ctx: &Context<'ctx>) -> Result<AccountType> {
        Ok(AccountType::of(self.fetch_code(ctx).await?))
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
enum AccountType {
    Contract,
    ExternallyOwned,
}

impl AccountType {
    /// An account with code attached is a contract.
    fn of(code: &[u8]) -> Self {
        if code.is_empty() {
            AccountType::ExternallyOwned
        } else {
            AccountType::Contract
        }
    }
}

#[derive(Enum, Copy, Clone, Default, Eq, PartialEq)]
enum Unit {
    #[default]
    Wei,
    Kwei,
    Mwei,
    Gwei,
    Szabo,
    Finney,
    Ether,
}

impl From<Unit> for Denomination {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::Wei => Denomination::Wei,
            Unit::Kwei => Denomination::Kwei,
            Unit::Mwei => Denomination::Mwei,
            Unit::Gwei => Denomination::Gwei,
            Unit::Szabo => Denomination::Szabo,
            Unit::Finney => Denomination::Finney,
            Unit::Ether => Denomination::Ether,
        }
    }
}

pub fn build_schema(config: &GraphqlConfig, state: StateSource) -> AccountSchema {
    let sdl = Schema::new(QueryRoot, EmptyMutation, EmptySubscription).sdl();
    let coercion_errors = CoercionErrors::new(&sdl).with_rejection("Address", Address::rejection);

    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .limit_depth(config.depth_limit)
        .limit_complexity(config.complexity_limit)
        .extension(coercion_errors)
        .data(state)
        .data(BatchLimit(config.max_batch))
        .finish()
}

#[handler]
async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().finish())
}

pub fn routes(schema: AccountSchema) -> impl Endpoint {
    Route::new()
        .at("/", get(graphiql).post(GraphQL::new(schema)))
        .with(Cors::new())
}

#[instrument(skip_all, fields(bind_address = %config.bind_address))]
pub async fn start(config: GraphqlConfig, state: StateSource) -> Result<JoinHandle<Result<()>>> {
    let app = routes(build_schema(&config, state));

    info!("starting graphql server");
    let handle = tokio::spawn(async move {
        Server::new(TcpListener::bind(config.bind_address))
            .run(app)
            .await
            .map_err(|e| eyre!(e))
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use ethql_primitives::{AccountInfo, EvmAddress};

    use super::*;
    use crate::explorer::state::{AccountState, GenesisState};

    const ZERO: &str = "0x0000000000000000000000000000000000000000";

    /// Serves contract code for every address and counts code reads.
    #[derive(Default)]
    struct CountingState {
        code_reads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AccountState for CountingState {
        async fn account_info(&self, address: EvmAddress) -> Result<AccountInfo> {
            Ok(AccountInfo {
                code: self.code(address).await?,
                ..Default::default()
            })
        }

        async fn code(&self, _address: EvmAddress) -> Result<Vec<u8>> {
            self.code_reads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0x60, 0x80])
        }
    }

    fn schema_with_batch(max_batch: usize) -> AccountSchema {
        let config = GraphqlConfig {
            max_batch,
            ..Default::default()
        };
        build_schema(&config, Arc::new(GenesisState::default()))
    }

    #[test]
    fn test_sdl_exposes_account_query() {
        let sdl = schema_with_batch(1).sdl();
        assert!(sdl.contains("scalar Address"));
        assert!(sdl.contains("account(address: Address!): Account!"));
        assert!(sdl.contains("accounts(addresses: [Address!]!): [Account!]!"));
        assert!(sdl.contains("EXTERNALLY_OWNED"));
    }

    #[tokio::test]
    async fn test_batch_limit() {
        let schema = schema_with_batch(1);
        let response = schema
            .execute(
                r#"{
                    accounts(addresses: [
                        "0x0000000000000000000000000000000000000000",
                        "0x0000000000000000000000000000000000000001"
                    ]) { code }
                }"#,
            )
            .await;

        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].message.starts_with("too many addresses"));
    }

    #[tokio::test]
    async fn test_code_is_read_once_per_account() {
        let state = Arc::new(CountingState::default());
        let schema = build_schema(&GraphqlConfig::default(), state.clone());

        let response = schema
            .execute(format!(r#"{{ account(address: "{}") {{ code type }} }}"#, ZERO))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            serde_json::json!({ "account": { "code": "0x6080", "type": "CONTRACT" } })
        );
        assert_eq!(state.code_reads.load(Ordering::SeqCst), 1);

        let response = schema
            .execute(format!(
                r#"{{ accounts(addresses: ["{}", "{}"]) {{ code type }} }}"#,
                ZERO, ZERO
            ))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(state.code_reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let config = GraphqlConfig {
            depth_limit: 1,
            ..Default::default()
        };
        let schema = build_schema(&config, Arc::new(GenesisState::default()));

        let response = schema
            .execute(format!(r#"{{ account(address: "{}") {{ code }} }}"#, ZERO))
            .await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "Query is nested too deep.");
        assert_eq!(response.data, async_graphql::Value::Null);
    }

    #[tokio::test]
    async fn test_complexity_limit() {
        let config = GraphqlConfig {
            complexity_limit: 1,
            ..Default::default()
        };
        let schema = build_schema(&config, Arc::new(GenesisState::default()));

        let response = schema
            .execute(format!(r#"{{ account(address: "{}") {{ code }} }}"#, ZERO))
            .await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "Query is too complex.");

        // the default limits leave room for the same query
        let response = schema_with_batch(1)
            .execute(format!(r#"{{ account(address: "{}") {{ code }} }}"#, ZERO))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
    }

    #[test]
    fn test_account_type_follows_code() {
        assert!(AccountType::of(&[]) == AccountType::ExternallyOwned);
        assert!(AccountType::of(&[0x60]) == AccountType::Contract);
    }

    #[test]
    fn test_unit_mapping() {
        assert_eq!(Denomination::from(Unit::default()), Denomination::Wei);
        assert_eq!(Denomination::from(Unit::Ether).decimals(), 18);
    }
}
