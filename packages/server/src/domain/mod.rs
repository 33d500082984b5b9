//! ドメイン層
//!
//! ゲームのエンティティ、イベント、外部協調者（永続化・共有ステート・サンドボックス・
//! メッセージ送信）のインターフェースを定義します。具体的な実装は Infrastructure 層が提供します。

pub mod entity;
pub mod error;
pub mod event;
pub mod game_state;
pub mod message_pusher;
pub mod repository;
pub mod sandbox;
pub mod state_store;
pub mod value_object;

pub use entity::{Challenge, ChallengeInfo, Player, TestCase, User};
pub use error::{ExecutionError, MessagePushError, RepositoryError, StoreError, SubmitError};
pub use event::{Event, EventBody, EventKind};
pub use game_state::{Countdown, GameState, SharedGameState};
pub use message_pusher::{ConnectionInfo, MessagePusher, PusherChannel, Unregistration};
pub use repository::{ChallengeRepository, UserRepository};
pub use sandbox::{
    ExecutionJob, ExecutionOutput, ExecutionQueue, ExecutionResult, Sandbox, SandboxImage,
};
pub use state_store::StateStore;
pub use value_object::{ChallengeId, ConnectionId, UserId};
