//! Domain models for the Playtime admin dashboard.

pub mod analytics;
pub mod audit_log;
pub mod bot;
pub mod common;
pub mod kyc;
pub mod playlist;
pub mod profile;
pub mod reward;
pub mod setting;
pub mod transaction;

pub use analytics::{ActivityItem, DailyAmount, DailyCount, DashboardStats};
pub use audit_log::{AuditAction, AuditLog, NewAuditLog};
pub use bot::{BotConfig, BotConfigPatch, BotLog, BotStats, BotStatus, LogLevel, NewBotConfig};
pub use common::{ListOptions, ALL_STATUSES, MAX_PAGE_LIMIT, NOT_AVAILABLE, UNKNOWN_USER};
pub use kyc::{DocumentType, KycDocument, KycDocumentView, KycReviewUpdate, KycStats, KycStatus};
pub use playlist::{
    CatalogTrack, NewPlaylist, Playlist, PlaylistDetail, PlaylistPatch, PlaylistTrack,
    PlaylistView, Track,
};
pub use profile::{AppRole, Profile, ProfileUpdate, UserDetail, UserRole, UserStats, UserView};
pub use reward::{
    LeaderboardEntry, ListeningSession, RewardConfig, RewardStats, RewardTransaction, UserReward,
};
pub use setting::{
    FaqEntry, LegalDocument, LegalKind, PageContent, PageSection, SettingCategory,
    SettingDecodeError, SettingPayload, SystemSetting,
};
pub use transaction::{
    Transaction, TransactionStats, TransactionStatus, TransactionType, TransactionView,
};
