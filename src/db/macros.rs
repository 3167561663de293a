//! Dispatch and parameter macros.
//!
//! `impl_db_dispatch!` expands one match arm per `DbConnection` variant so
//! code that reads the same for every backend is written once but still
//! type-checked against each driver's concrete connection type.

/// Macro for generating connection dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(conn, {
///     MySql(c) => sqlx::raw_sql("COMMIT").execute(c).await,
///     SQLite(c) => sqlx::raw_sql("COMMIT").execute(c).await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::connection::DbConnection::$variant($c) => $body,
            )+
        }
    };
}

/// Build a `Vec<SqlValue>` from anything convertible into `SqlValue`.
///
/// ```
/// use simple_db::sql_params;
/// use simple_db::models::SqlValue;
///
/// let params = sql_params!["hello", 42, None::<i64>];
/// assert_eq!(params[1], SqlValue::Int(42));
/// assert_eq!(params[2], SqlValue::Null);
/// ```
#[macro_export]
macro_rules! sql_params {
    () => {
        ::std::vec::Vec::<$crate::models::SqlValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::models::SqlValue::from($value)),+]
    };
}

pub use impl_db_dispatch;
pub use sql_params;
