pub mod db;
pub mod mailer;

pub use db::PgStore;
pub use mailer::TracingMailer;
