//! Server state shared by all handlers.

use std::sync::Arc;

use crate::{
    config::HubConfig,
    usecase::{
        AuthenticateUserUseCase, ConnectPlayerUseCase, DisconnectPlayerUseCase, EventRouter,
        GetGameStateUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// AuthenticateUserUseCase（トークン認証のユースケース）
    pub authenticate_user_usecase: Arc<AuthenticateUserUseCase>,
    /// ConnectPlayerUseCase（プレイヤー接続のユースケース）
    pub connect_player_usecase: Arc<ConnectPlayerUseCase>,
    /// DisconnectPlayerUseCase（プレイヤー切断のユースケース）
    pub disconnect_player_usecase: Arc<DisconnectPlayerUseCase>,
    /// EventRouter（クライアントイベントの振り分け）
    pub event_router: Arc<EventRouter>,
    /// GetGameStateUseCase（ゲーム状態取得のユースケース）
    pub get_game_state_usecase: Arc<GetGameStateUseCase>,
    /// Per-connection pump limits
    pub hub_config: HubConfig,
}
