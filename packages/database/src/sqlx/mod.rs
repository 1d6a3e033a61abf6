#[cfg(feature = "mysql-sqlx")]
/// `MySQL` database backend using `SQLx`
pub mod mysql;
