pub mod artwork;
pub mod browse;
pub mod characters;
pub mod convert;
pub mod middleware;
pub mod moderation;
pub mod players;
pub mod state;
pub mod storage_admin;
pub mod submissions;
