//! MySQL backend
//!
//! Wraps mysql_async behind the engine's [`Connection`] trait. The driver
//! connection moves in and out of the handle around each call because
//! mysql_async executes on an owned `Conn`.

use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use mysql_async::prelude::*;
use mysql_async::Conn;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::connection::{Connection, ConnectionConfig, ConnectionFactory};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::types::{Row, Value};

/// Convert an engine value to a MySQL parameter
fn value_to_sql(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(b) => mysql_async::Value::from(*b),
        Value::Int16(n) => mysql_async::Value::from(*n),
        Value::Int32(n) => mysql_async::Value::from(*n),
        Value::Int64(n) => mysql_async::Value::from(*n),
        Value::Float32(n) => mysql_async::Value::from(*n),
        Value::Float64(n) => mysql_async::Value::from(*n),
        // MySQL DECIMAL travels as text
        Value::Decimal(d) => mysql_async::Value::from(d.to_string()),
        Value::String(s) => mysql_async::Value::from(s.clone()),
        Value::Bytes(b) => mysql_async::Value::from(b.clone()),
        Value::Date(d) => {
            mysql_async::Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0)
        }
        Value::Time(t) => mysql_async::Value::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1000,
        ),
        Value::DateTime(dt) => {
            let (date, time) = (dt.date(), dt.time());
            mysql_async::Value::Date(
                date.year() as u16,
                date.month() as u8,
                date.day() as u8,
                time.hour() as u8,
                time.minute() as u8,
                time.second() as u8,
                time.nanosecond() / 1000,
            )
        }
        Value::DateTimeTz(dt) => {
            let naive = dt.naive_utc();
            let (date, time) = (naive.date(), naive.time());
            mysql_async::Value::Date(
                date.year() as u16,
                date.month() as u8,
                date.day() as u8,
                time.hour() as u8,
                time.minute() as u8,
                time.second() as u8,
                time.nanosecond() / 1000,
            )
        }
        Value::Uuid(u) => mysql_async::Value::from(u.to_string()),
        Value::Json(j) => mysql_async::Value::from(j.to_string()),
    }
}

/// Convert a MySQL value to an engine value
fn mysql_value_to_value(val: mysql_async::Value) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(b) => match String::from_utf8(b.clone()) {
            Ok(s) => Value::String(s),
            Err(_) => Value::Bytes(b),
        },
        mysql_async::Value::Int(n) => Value::Int64(n),
        mysql_async::Value::UInt(n) => Value::Int64(n as i64),
        mysql_async::Value::Float(f) => Value::Float32(f),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            let date = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32);
            match date {
                Some(date) if hour == 0 && min == 0 && sec == 0 && micro == 0 => Value::Date(date),
                Some(date) => chrono::NaiveTime::from_hms_micro_opt(
                    hour as u32,
                    min as u32,
                    sec as u32,
                    micro,
                )
                .map(|time| Value::DateTime(chrono::NaiveDateTime::new(date, time)))
                .unwrap_or(Value::Null),
                None => Value::Null,
            }
        }
        mysql_async::Value::Time(_, days, hour, min, sec, micro) => {
            let total_hours = days * 24 + hour as u32;
            chrono::NaiveTime::from_hms_micro_opt(total_hours % 24, min as u32, sec as u32, micro)
                .map(Value::Time)
                .unwrap_or(Value::Null)
        }
    }
}

/// MySQL connection
pub struct MySqlConnection {
    conn: Arc<Mutex<Option<Conn>>>,
}

impl MySqlConnection {
    /// Wrap an established mysql_async connection
    pub fn new(conn: Conn) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    async fn take_conn(&self) -> Result<Conn> {
        self.conn
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::connection("connection is closed or in use"))
    }

    async fn put_conn(&self, conn: Conn) {
        *self.conn.lock().await = Some(conn);
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut conn = self.take_conn().await?;
        let mysql_params: Vec<mysql_async::Value> = params.iter().map(value_to_sql).collect();

        let result: std::result::Result<Vec<mysql_async::Row>, _> =
            conn.exec(sql, mysql_params).await;
        self.put_conn(conn).await;

        let mysql_rows = result.map_err(|e| Error::execution_with_sql(e.to_string(), sql))?;

        Ok(mysql_rows
            .into_iter()
            .map(|row| {
                let columns: Vec<String> = row
                    .columns_ref()
                    .iter()
                    .map(|c| c.name_str().to_string())
                    .collect();
                let values: Vec<Value> = (0..row.len())
                    .map(|i| {
                        let val: mysql_async::Value =
                            row.get(i).unwrap_or(mysql_async::Value::NULL);
                        mysql_value_to_value(val)
                    })
                    .collect();
                Row::new(columns, values)
            })
            .collect())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut conn = self.take_conn().await?;
        let mysql_params: Vec<mysql_async::Value> = params.iter().map(value_to_sql).collect();

        let result = conn.exec_drop(sql, mysql_params).await;
        let affected = conn.affected_rows();
        self.put_conn(conn).await;

        result.map_err(|e| Error::execution_with_sql(e.to_string(), sql))?;
        Ok(affected)
    }

    async fn is_valid(&self) -> bool {
        let mut guard = self.conn.lock().await;
        match guard.as_mut() {
            Some(conn) => conn.ping().await.is_ok(),
            None => false,
        }
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.disconnect()
                .await
                .map_err(|e| Error::connection(format!("failed to close connection: {}", e)))?;
        }
        Ok(())
    }
}

/// MySQL connection factory
#[derive(Debug, Clone, Default)]
pub struct MySqlConnectionFactory;

#[async_trait]
impl ConnectionFactory for MySqlConnectionFactory {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let opts = mysql_async::Opts::from_url(&config.url)
            .map_err(|e| Error::config(format!("invalid MySQL connection string: {}", e)))?;

        let conn =
            tokio::time::timeout(Duration::from_millis(config.connect_timeout_ms), Conn::new(opts))
                .await
                .map_err(|_| Error::connection("connect timed out"))?
                .map_err(|e| Error::connection_with_source("failed to connect", e))?;

        Ok(Box::new(MySqlConnection::new(conn)))
    }

    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }
}
