use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use mdi_core::Environment;
use std::time::Duration;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Connections are recycled after this long.
const MAX_CONNECTION_LIFETIME: Duration = Duration::from_secs(3600);

/// Stamps every new connection with the run's environment schema.
///
/// The schema name comes from the [`Environment`] enum, never from user
/// input, so splicing it into `SET search_path` is safe. One pool serves
/// exactly one environment; statements from different schemas never share
/// a connection.
#[derive(Debug, Clone, Copy)]
struct SearchPathCustomizer {
  schema: &'static str,
}

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for SearchPathCustomizer {
  fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
    diesel::sql_query(format!("SET search_path TO {}, public", self.schema))
      .execute(conn)
      .map(|_| ())
      .map_err(diesel::r2d2::Error::QueryError)
  }
}

/// Build the connection pool for one (database, environment) pair.
pub fn build_pool(
  database_url: &str,
  environment: Environment,
  max_size: u32,
) -> Result<PgPool, diesel::r2d2::PoolError> {
  let manager = ConnectionManager::<PgConnection>::new(database_url);

  Pool::builder()
    .max_size(max_size)
    .test_on_check_out(true)
    .max_lifetime(Some(MAX_CONNECTION_LIFETIME))
    .connection_customizer(Box::new(SearchPathCustomizer { schema: environment.schema_name() }))
    .build(manager)
}

/// Establish a single database connection
pub fn establish_connection(database_url: &str) -> Result<PgConnection, diesel::ConnectionError> {
  PgConnection::establish(database_url)
}
