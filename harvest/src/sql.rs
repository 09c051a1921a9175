//! Parameterized MySQL statements for SQL-backed checkpoint stores.
//!
//! Each symbol gets one table per dataset: `fc_<symbol>` for candles and
//! `ft_<symbol>` for trades, lowercase. Checkpoints live in one shared
//! `harvest_checkpoints` table keyed by `(symbol, dataset)`.
//!
//! A store commits the output of [`commit_statements`] inside a single
//! transaction so rows and checkpoint move together.

use std::fmt;

use chrono::{DateTime, Utc};
use harvest_core::{Candle, Checkpoint, Dataset, Symbol, Trade, WriteBatch};
use rust_decimal::Decimal;

/// Table holding one checkpoint per `(symbol, dataset)`.
pub const CHECKPOINT_TABLE: &str = "harvest_checkpoints";

/// Format used for `DATETIME` parameters.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CANDLE_COLUMNS: [&str; 10] = [
    "time",
    "open",
    "high",
    "low",
    "close",
    "number",
    "quantity",
    "purchases",
    "asset",
    "sales",
];

const TRADE_COLUMNS: [&str; 6] = [
    "id",
    "time",
    "price",
    "quantity",
    "quote_quantity",
    "buyer_maker",
];

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// Unsigned integer.
    UInt(u64),
    /// Text.
    Text(String),
    /// Exact decimal; bind as `DECIMAL`, never as a float.
    Decimal(Decimal),
    /// UTC timestamp, rendered with [`TIMESTAMP_FORMAT`].
    Timestamp(DateTime<Utc>),
    /// Boolean.
    Bool(bool),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_FORMAT)),
            Self::Bool(v) => f.write_str(if *v { "1" } else { "0" }),
        }
    }
}

/// SQL text with `?` placeholders and the values to bind, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Statement text.
    pub sql: String,
    /// Positional parameters.
    pub params: Vec<SqlValue>,
}

/// Per-symbol table name for `dataset`.
#[must_use]
pub fn table_name(symbol: &Symbol, dataset: Dataset) -> String {
    let prefix = match dataset {
        Dataset::Candles => "fc",
        Dataset::Trades => "ft",
    };
    format!("{prefix}_{}", symbol.lowercase())
}

fn candle_row(c: &Candle) -> [SqlValue; 10] {
    [
        SqlValue::Timestamp(c.period_start),
        SqlValue::Decimal(c.open),
        SqlValue::Decimal(c.high),
        SqlValue::Decimal(c.low),
        SqlValue::Decimal(c.close),
        SqlValue::UInt(c.trade_count),
        SqlValue::Decimal(c.base_volume),
        SqlValue::Decimal(c.taker_buy_base_volume),
        SqlValue::Decimal(c.quote_volume),
        SqlValue::Decimal(c.taker_buy_quote_volume),
    ]
}

fn trade_row(t: &Trade) -> [SqlValue; 6] {
    [
        SqlValue::UInt(t.trade_id),
        SqlValue::Timestamp(t.executed_at),
        SqlValue::Decimal(t.price),
        SqlValue::Decimal(t.quantity),
        SqlValue::Decimal(t.quote_quantity),
        SqlValue::Bool(t.is_buyer_maker),
    ]
}

fn multi_row_insert<const N: usize>(
    table: &str,
    columns: [&str; N],
    rows: impl ExactSizeIterator<Item = [SqlValue; N]>,
) -> Statement {
    let group = format!("({})", vec!["?"; N].join(","));
    let count = rows.len();
    let mut params = Vec::with_capacity(count * N);
    for row in rows {
        params.extend(row);
    }
    Statement {
        sql: format!(
            "INSERT INTO {table} ({}) VALUES {}",
            columns.join(","),
            vec![group; count].join(",")
        ),
        params,
    }
}

/// One multi-row `INSERT` for the whole batch, or `None` when it is empty.
#[must_use]
pub fn insert_batch(symbol: &Symbol, batch: WriteBatch<'_>) -> Option<Statement> {
    if batch.is_empty() {
        return None;
    }
    let table = table_name(symbol, batch.dataset());
    Some(match batch {
        WriteBatch::Candles(c) => multi_row_insert(&table, CANDLE_COLUMNS, c.iter().map(candle_row)),
        WriteBatch::Trades(t) => multi_row_insert(&table, TRADE_COLUMNS, t.iter().map(trade_row)),
    })
}

/// Insert or replace the checkpoint of `symbol`.
#[must_use]
pub fn upsert_checkpoint(symbol: &Symbol, checkpoint: &Checkpoint) -> Statement {
    let position = match checkpoint {
        Checkpoint::Candle { period_start } => SqlValue::Timestamp(*period_start),
        Checkpoint::Trade { trade_id } => SqlValue::UInt(*trade_id),
    };
    Statement {
        sql: format!(
            "INSERT INTO {CHECKPOINT_TABLE} (symbol, dataset, position) VALUES (?,?,?) \
             ON DUPLICATE KEY UPDATE position = VALUES(position)"
        ),
        params: vec![
            SqlValue::Text(symbol.as_str().to_owned()),
            SqlValue::Text(checkpoint.dataset().as_str().to_owned()),
            position,
        ],
    }
}

/// Statements for one atomic commit: the rows first, then the checkpoint.
#[must_use]
pub fn commit_statements(
    symbol: &Symbol,
    batch: WriteBatch<'_>,
    checkpoint: &Checkpoint,
) -> Vec<Statement> {
    insert_batch(symbol, batch)
        .into_iter()
        .chain(std::iter::once(upsert_checkpoint(symbol, checkpoint)))
        .collect()
}
