//! UseCase 層
//!
//! ビジネスロジックを実装します。各ユースケースはドメイン層の trait にのみ依存し、
//! 具体的な実装（インメモリ・WebSocket・Docker）は起動時に注入されます。

pub mod authenticate_user;
pub mod connect_player;
pub mod disconnect_player;
pub mod error;
pub mod game_state_machine;
pub mod get_game_state;
pub mod route_event;
pub mod run_code;

#[cfg(test)]
pub(crate) mod testing;

pub use authenticate_user::AuthenticateUserUseCase;
pub use connect_player::ConnectPlayerUseCase;
pub use disconnect_player::DisconnectPlayerUseCase;
pub use error::{AuthError, ConnectError, DisconnectError, RouteError, RunCodeError, TickError};
pub use game_state_machine::{GameConfig, GameHandle, GameStateMachine};
pub use get_game_state::{GameOverview, GetGameStateUseCase};
pub use route_event::EventRouter;
pub use run_code::RunCodeUseCase;
