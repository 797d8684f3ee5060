// ── CRUD operations ──
//
// Terminal calls on `Query`. Mutations run in strict phases: resolve
// references, pick targets, send the command, re-read the affected rows,
// and for `add` with `place-after` move the new row into place. Nothing is
// retried; the first error ends the operation.

use futures_util::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use crate::convert::wire_key;
use crate::error::CoreError;
use crate::item::Item;
use crate::menu::Menu;
use crate::model::{Reference, Row};
use crate::normalize::order_by_ids;
use crate::query::{Filter, ParamValue, PendingQuery, Query};
use crate::resolve::Resolver;

/// Rows touched by a mutation, re-read after the command.
///
/// `One` when the command targeted a single id, `Many` when it targeted a
/// list, `None` when nothing matched and nothing was sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Affected {
    #[default]
    None,
    One(Row),
    Many(Vec<Row>),
}

impl Affected {
    fn from_rows(mut rows: Vec<Row>, single: bool) -> Self {
        if rows.is_empty() {
            Self::None
        } else if single {
            Self::One(rows.swap_remove(0))
        } else {
            Self::Many(rows)
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::One(_) => 1,
            Self::Many(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The single row, or the first of several.
    pub fn first(&self) -> Option<&Row> {
        match self {
            Self::None => None,
            Self::One(row) => Some(row),
            Self::Many(rows) => rows.first(),
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::None => Vec::new(),
            Self::One(row) => vec![row],
            Self::Many(rows) => rows,
        }
    }
}

/// Rows a targeting command will act on.
enum Target {
    /// Filters matched nothing; send nothing.
    Nothing,
    /// Explicit or looked-up ids.
    Ids(Vec<String>),
    /// No target at all; the command goes out as-is (singleton menus).
    Menu,
}

impl Target {
    async fn refresh(&self, menu: &Menu) -> Result<Affected, CoreError> {
        match self {
            Self::Nothing => Ok(Affected::None),
            Self::Ids(ids) => {
                let rows = fetch_by_ids(menu, ids).await?;
                Ok(Affected::from_rows(rows, ids.len() == 1))
            }
            Self::Menu => {
                let rows = fetch_all(menu).await?;
                let single = rows.len() == 1;
                Ok(Affected::from_rows(rows, single))
            }
        }
    }
}

impl Query {
    // ── Reads ────────────────────────────────────────────────────────

    /// Print the menu with the queued filters and projection.
    pub async fn get(mut self) -> Result<Vec<Row>, CoreError> {
        self.check()?;
        let Query { menu, mut pending, .. } = self;
        Resolver::new(&menu).resolve_params(&mut pending).await?;
        let raw = menu.write(pending.full_query(menu.path(), "print")).await?;
        Ok(menu.normalize(&raw))
    }

    /// Alias of [`get`](Self::get).
    pub async fn get_all(self) -> Result<Vec<Row>, CoreError> {
        self.get().await
    }

    /// Alias of [`get`](Self::get).
    pub async fn print(self) -> Result<Vec<Row>, CoreError> {
        self.get().await
    }

    /// First matching row, or `None`.
    pub async fn find(self) -> Result<Option<Row>, CoreError> {
        Ok(self.get().await?.into_iter().next())
    }

    /// Alias of [`find`](Self::find).
    pub async fn first(self) -> Result<Option<Row>, CoreError> {
        self.find().await
    }

    /// Alias of [`find`](Self::find).
    pub async fn get_one(self) -> Result<Option<Row>, CoreError> {
        self.find().await
    }

    /// Matching rows wrapped as [`Item`] handles.
    pub async fn get_items(self) -> Result<Vec<Item>, CoreError> {
        let menu = self.menu.clone();
        Ok(self
            .get()
            .await?
            .into_iter()
            .map(|row| Item::new(menu.clone(), row))
            .collect())
    }

    /// Number of matching rows (`=count-only=`).
    pub async fn count(self) -> Result<u64, CoreError> {
        let mut query = self.options(["count-only"]);
        query.check()?;
        let Query { menu, pending, .. } = query;
        let raw = menu.write(pending.full_query(menu.path(), "print")).await?;
        let counted = raw
            .iter()
            .find_map(|row| row.get("ret"))
            .and_then(|ret| ret.parse::<u64>().ok());
        Ok(counted.unwrap_or_else(|| u64::try_from(raw.len()).unwrap_or(u64::MAX)))
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Add a row and return it as stored by the device.
    ///
    /// `placeBefore` puts the row above another. `placeAfter` adds the row
    /// and then moves it above the row that used to follow the reference.
    pub async fn add(mut self, data: Value) -> Result<Row, CoreError> {
        if let Some(fields) = self.object(data) {
            self.push_params(&fields);
        }
        self.check()?;
        let Query { menu, mut pending, .. } = self;
        let resolver = Resolver::new(&menu);

        let follower = match pending.take_param("place-after") {
            Some(anchor) => {
                let anchor = match anchor {
                    ParamValue::Literal(id) => id,
                    ParamValue::Reference(reference) => {
                        resolver.resolve("place-after", &reference).await?
                    }
                };
                resolver.row_after(&anchor).await?
            }
            None => None,
        };
        resolver.resolve_params(&mut pending).await?;

        let raw = menu.write(pending.full_query(menu.path(), "add")).await?;
        let id = raw
            .iter()
            .find_map(|row| row.get("ret"))
            .cloned()
            .ok_or_else(|| malformed("add reply carried no new id"))?;

        let row = fetch_by_ids(&menu, std::slice::from_ref(&id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| malformed("added row could not be read back"))?;

        if let Some(follower) = follower {
            debug!(menu = %menu.path(), id = %id, before = %follower, "repositioning new row");
            menu.write(vec![
                menu.path().command("move"),
                format!("=numbers={id}"),
                format!("=destination={follower}"),
            ])
            .await?;
        }
        Ok(row)
    }

    /// Alias of [`add`](Self::add).
    pub async fn create(self, data: Value) -> Result<Row, CoreError> {
        self.add(data).await
    }

    /// Set fields on the targeted rows and return them re-read.
    pub async fn update(mut self, data: Value) -> Result<Affected, CoreError> {
        if let Some(fields) = self.object(data) {
            self.push_params(&fields);
        }
        self.targeted("set").await
    }

    /// Alias of [`update`](Self::update).
    pub async fn set(self, data: Value) -> Result<Affected, CoreError> {
        self.update(data).await
    }

    /// Alias of [`update`](Self::update).
    pub async fn edit(self, data: Value) -> Result<Affected, CoreError> {
        self.update(data).await
    }

    pub async fn enable(self) -> Result<Affected, CoreError> {
        self.targeted("enable").await
    }

    pub async fn disable(self) -> Result<Affected, CoreError> {
        self.targeted("disable").await
    }

    /// Remove the targeted rows and return them as they were.
    pub async fn remove(mut self) -> Result<Affected, CoreError> {
        self.check()?;
        let Query { menu, mut pending, .. } = self;
        let target = select_target(&menu, &mut pending).await?;
        if matches!(target, Target::Nothing) {
            return Ok(Affected::None);
        }
        let before = target.refresh(&menu).await?;
        menu.write(pending.full_query(menu.path(), "remove")).await?;
        Ok(before)
    }

    /// Alias of [`remove`](Self::remove).
    pub async fn delete(self) -> Result<Affected, CoreError> {
        self.remove().await
    }

    /// Remove every row matching all fields of `data`. No match is not an
    /// error.
    pub async fn remove_matching(self, data: Value) -> Result<Affected, CoreError> {
        self.filter_all(data).remove().await
    }

    /// Clear `properties` on the targeted rows, one command per property.
    pub async fn unset<I, S>(mut self, properties: I) -> Result<Affected, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.check()?;
        let Query { menu, mut pending, .. } = self;
        let target = select_target(&menu, &mut pending).await?;
        if matches!(target, Target::Nothing) {
            return Ok(Affected::None);
        }
        let sentences: Vec<Vec<String>> = properties
            .into_iter()
            .map(|property| {
                let mut single = pending.clone();
                single.push_param("value-name", ParamValue::Literal(wire_key(property.as_ref())));
                single.full_query(menu.path(), "unset")
            })
            .collect();
        try_join_all(sentences.into_iter().map(|sentence| menu.write(sentence))).await?;
        target.refresh(&menu).await
    }

    /// Move `from` above `to`, or to the end of the list when `to` is `None`.
    pub async fn move_above(
        mut self,
        from: impl Into<Reference>,
        to: Option<Reference>,
    ) -> Result<Affected, CoreError> {
        self.pending
            .push_param("numbers", ParamValue::Reference(from.into()));
        if let Some(to) = to {
            self.pending
                .push_param("destination", ParamValue::Reference(to));
        }
        self.targeted("move").await
    }

    /// Run any command on the menu, e.g. `export` or `monitor-traffic`.
    /// References in `data` are resolved; no implicit target lookup.
    pub async fn exec(mut self, command: &str, data: Option<Value>) -> Result<Vec<Row>, CoreError> {
        if let Some(fields) = data.and_then(|data| self.object(data)) {
            self.push_params(&fields);
        }
        self.check()?;
        let Query { menu, mut pending, .. } = self;
        Resolver::new(&menu).resolve_params(&mut pending).await?;
        let raw = menu.write(pending.full_query(menu.path(), command)).await?;
        Ok(menu.normalize(&raw))
    }

    /// Remove every row of the menu. Returns the removed ids.
    pub async fn purge(self) -> Result<Vec<String>, CoreError> {
        let menu = self.menu;
        let ids = Resolver::new(&menu).lookup_ids(&[]).await?;
        if ids.is_empty() {
            return Ok(ids);
        }
        menu.write(vec![
            menu.path().command("remove"),
            format!("=numbers={}", ids.join(",")),
        ])
        .await?;
        Ok(ids)
    }

    // ── Shared flow ──────────────────────────────────────────────────

    async fn targeted(mut self, action: &str) -> Result<Affected, CoreError> {
        self.check()?;
        let Query { menu, mut pending, .. } = self;
        let target = select_target(&menu, &mut pending).await?;
        if matches!(target, Target::Nothing) {
            return Ok(Affected::None);
        }
        menu.write(pending.full_query(menu.path(), action)).await?;
        target.refresh(&menu).await
    }
}

/// Resolve references and settle which rows the command acts on.
///
/// An explicit `numbers`/`.id` wins and queued filters are dropped; item
/// numbers and names in it are swapped for `.id`s so the refresh can find
/// the rows. Otherwise filters drive an id lookup that becomes `numbers`.
async fn select_target(menu: &Menu, pending: &mut PendingQuery) -> Result<Target, CoreError> {
    let resolver = Resolver::new(menu);
    resolver.resolve_params(pending).await?;

    if let Some(ids) = pending.target_ids() {
        pending.take_filters();
        let key = pending
            .target_param_mut()
            .map_or_else(|| "numbers".to_owned(), |param| param.key.clone());
        let ids = resolver.concrete_ids(&key, ids).await?;
        if let Some(param) = pending.target_param_mut() {
            param.value = ParamValue::Literal(ids.join(","));
        }
        return Ok(Target::Ids(ids));
    }
    if !pending.has_filters() {
        return Ok(Target::Menu);
    }
    let filters = pending.take_filters();
    let ids = resolver.implicit_targets(&filters).await?;
    if ids.is_empty() {
        return Ok(Target::Nothing);
    }
    pending.set_param("numbers", ParamValue::Literal(ids.join(",")));
    Ok(Target::Ids(ids))
}

async fn fetch_by_ids(menu: &Menu, ids: &[String]) -> Result<Vec<Row>, CoreError> {
    let Some(filter) = Filter::any_id(ids) else {
        return Ok(Vec::new());
    };
    let mut sentence = vec![menu.path().command("print")];
    filter.write_words(&mut sentence);
    let raw = menu.write(sentence).await?;
    Ok(order_by_ids(menu.normalize(&raw), ids))
}

async fn fetch_all(menu: &Menu) -> Result<Vec<Row>, CoreError> {
    let raw = menu.write(vec![menu.path().command("print")]).await?;
    Ok(menu.normalize(&raw))
}

fn malformed(message: &str) -> CoreError {
    CoreError::Transport(tikly_api::Error::Malformed {
        message: message.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MenuPath;

    fn row(id: &str) -> Row {
        let mut row = Row::new(MenuPath::new("/ip/route"));
        row.insert("id", Value::String(id.into()));
        row
    }

    #[test]
    fn shape_follows_target_count() {
        assert_eq!(Affected::from_rows(vec![], true), Affected::None);
        assert_eq!(Affected::from_rows(vec![row("*1")], true), Affected::One(row("*1")));
        assert_eq!(
            Affected::from_rows(vec![row("*1")], false),
            Affected::Many(vec![row("*1")])
        );
        let many = Affected::from_rows(vec![row("*1"), row("*2")], false);
        assert_eq!(many.len(), 2);
        assert_eq!(many.first().and_then(Row::id), Some("*1"));
    }
}
