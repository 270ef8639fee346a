// wallet.rs - 錢包連接模組
//
// 負責錢包提供方的連接狀態機：直連與重定向兩種授權流程、
// 跨頁面重載的回調恢復，以及會話的持久化與重新驗證。

pub mod connector;
pub mod pending;
pub mod provider;
pub mod rpc;
pub mod session;
pub mod store;

// 重新導出常用類型
pub use connector::{ConnectOutcome, ConnectorError, ConnectorResult, WalletConnector};
pub use pending::{resolve_callback, CallbackParams, CallbackResolution, PendingConnection};
pub use provider::{ProviderError, WalletProvider};
pub use rpc::HttpWalletProvider;
pub use session::{ConnectionState, WalletProviderKind, WalletSession};
pub use store::{keys, read_value, write_value, ClientStore, ClientStoreError, InMemoryClientStore, JsonFileClientStore};
