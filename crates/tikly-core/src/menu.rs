// ── Session and menu entry points ──
//
// A `Session` wraps one transport and the case convention for its rows.
// `Session::menu` hands out cheap, immutable `Menu` handles; every query
// chain starts from one of those.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tikly_api::{Connector, RawRow, Transport};
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::convert::CaseConvention;
use crate::crud::Affected;
use crate::error::CoreError;
use crate::item::Item;
use crate::model::{MenuPath, Reference, Row};
use crate::normalize::normalize;
use crate::query::Query;

/// Entry point bound to one device connection.
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
    case: CaseConvention,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            case: CaseConvention::default(),
        }
    }

    /// Open a transport through `connector` with `config.transport` and
    /// wrap it using `config.case`.
    pub async fn connect(connector: &dyn Connector, config: &SessionConfig) -> Result<Self, CoreError> {
        debug!(address = %config.transport.address(), tls = config.transport.tls.is_enabled(), "connecting");
        let transport = connector.connect(&config.transport).await?;
        Ok(Self::from_config(transport, config))
    }

    /// Session over an already open `transport`. Only `config.case` is
    /// read; the connection parameters were used when `transport` was built.
    pub fn from_config(transport: Arc<dyn Transport>, config: &SessionConfig) -> Self {
        Self::new(transport).with_case(config.case)
    }

    pub fn with_case(mut self, case: CaseConvention) -> Self {
        self.case = case;
        self
    }

    /// Return rows in snake_case instead of camelCase.
    pub fn use_snake_case(self) -> Self {
        self.with_case(CaseConvention::Snake)
    }

    pub fn case(&self) -> CaseConvention {
        self.case
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Handle for a menu. Accepts `"ip address"`, `"/ip/address"` or
    /// `"/ip/address/print"`.
    pub fn menu(&self, path: &str) -> Menu {
        Menu::new(MenuPath::new(path), Arc::clone(&self.transport), self.case)
    }

    /// Wrap a row as an [`Item`] acting on the menu it was read from.
    pub fn item(&self, row: Row) -> Item {
        let menu = Menu::new(row.menu().clone(), Arc::clone(&self.transport), self.case);
        Item::new(menu, row)
    }

    pub fn items(&self, rows: Vec<Row>) -> Vec<Item> {
        rows.into_iter().map(|row| self.item(row)).collect()
    }

    /// Send a hand-built sentence and return the raw reply.
    pub async fn write(&self, sentence: Vec<String>) -> Result<Vec<RawRow>, CoreError> {
        trace!(?sentence, "raw write");
        Ok(self.transport.write(sentence).await?)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("case", &self.case).finish_non_exhaustive()
    }
}

// ── Menu ─────────────────────────────────────────────────────────────

struct MenuInner {
    path: MenuPath,
    transport: Arc<dyn Transport>,
    case: CaseConvention,
}

/// One menu on the device, e.g. `/ip/firewall/filter`.
///
/// Cloning is cheap. A `Menu` holds no query state; each chain gets its own
/// [`Query`], so concurrent chains on one menu never interfere.
#[derive(Clone)]
pub struct Menu {
    inner: Arc<MenuInner>,
}

impl Menu {
    pub(crate) fn new(path: MenuPath, transport: Arc<dyn Transport>, case: CaseConvention) -> Self {
        Self {
            inner: Arc::new(MenuInner {
                path,
                transport,
                case,
            }),
        }
    }

    pub fn path(&self) -> &MenuPath {
        &self.inner.path
    }

    pub fn case(&self) -> CaseConvention {
        self.inner.case
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Start an empty query chain.
    pub fn query(&self) -> Query {
        Query::new(self.clone())
    }

    // ── Chain starters ───────────────────────────────────────────────

    pub fn select<I, S>(&self, fields: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.query().select(fields)
    }

    pub fn filter(&self, key: &str, value: impl Into<Value>) -> Query {
        self.query().filter(key, value)
    }

    pub fn filter_all(&self, fields: Value) -> Query {
        self.query().filter_all(fields)
    }

    pub fn filter_higher(&self, key: &str, value: impl Into<Value>) -> Query {
        self.query().filter_higher(key, value)
    }

    pub fn filter_lower(&self, key: &str, value: impl Into<Value>) -> Query {
        self.query().filter_lower(key, value)
    }

    pub fn target(&self, reference: impl Into<Reference>) -> Query {
        self.query().target(reference)
    }

    pub async fn get(&self) -> Result<Vec<Row>, CoreError> {
        self.query().get().await
    }

    pub async fn get_all(&self) -> Result<Vec<Row>, CoreError> {
        self.query().get_all().await
    }

    /// Remove every row matching all fields of `data`.
    pub async fn remove_matching(&self, data: Value) -> Result<Affected, CoreError> {
        self.query().remove_matching(data).await
    }

    pub async fn add(&self, data: Value) -> Result<Row, CoreError> {
        self.query().add(data).await
    }

    pub async fn exec(&self, command: &str, data: Option<Value>) -> Result<Vec<Row>, CoreError> {
        self.query().exec(command, data).await
    }

    // ── Round trips ──────────────────────────────────────────────────

    /// Send one sentence through the transport.
    pub(crate) async fn write(&self, sentence: Vec<String>) -> Result<Vec<RawRow>, CoreError> {
        debug!(
            menu = %self.inner.path,
            command = sentence.first().map(String::as_str).unwrap_or_default(),
            words = sentence.len(),
            "device round trip"
        );
        trace!(?sentence, "sentence");
        let rows = self.inner.transport.write(sentence).await?;
        trace!(rows = rows.len(), "reply");
        Ok(rows)
    }

    pub(crate) fn normalize(&self, rows: &[RawRow]) -> Vec<Row> {
        normalize(rows, &self.inner.path, self.inner.case)
    }
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("path", &self.inner.path)
            .field("case", &self.inner.case)
            .finish_non_exhaustive()
    }
}
