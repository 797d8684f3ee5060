// ── Row handles ──
//
// An `Item` pairs a row with the menu it came from so the row can be
// changed in place. Each mutation targets the row's own id and replaces the
// held row with the device's fresh copy.

use serde_json::Value;

use crate::crud::Affected;
use crate::error::CoreError;
use crate::menu::Menu;
use crate::model::{Reference, Row};

#[derive(Debug, Clone)]
pub struct Item {
    menu: Menu,
    row: Row,
}

impl Item {
    pub fn new(menu: Menu, row: Row) -> Self {
        Self { menu, row }
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn into_row(self) -> Row {
        self.row
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn id(&self) -> Option<&str> {
        self.row.id()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.row.get(key)
    }

    pub async fn update(&mut self, data: Value) -> Result<&Row, CoreError> {
        let id = self.require_id()?;
        let affected = self.menu.target(id).update(data).await?;
        self.absorb(affected)
    }

    /// Alias of [`update`](Self::update).
    pub async fn set(&mut self, data: Value) -> Result<&Row, CoreError> {
        self.update(data).await
    }

    pub async fn enable(&mut self) -> Result<&Row, CoreError> {
        let id = self.require_id()?;
        let affected = self.menu.target(id).enable().await?;
        self.absorb(affected)
    }

    pub async fn disable(&mut self) -> Result<&Row, CoreError> {
        let id = self.require_id()?;
        let affected = self.menu.target(id).disable().await?;
        self.absorb(affected)
    }

    /// Move above `to`, or to the end when `to` is `None`.
    pub async fn move_above(&mut self, to: Option<Reference>) -> Result<&Row, CoreError> {
        let id = self.require_id()?;
        let affected = self.menu.query().move_above(id, to).await?;
        self.absorb(affected)
    }

    pub async fn unset<I, S>(&mut self, properties: I) -> Result<&Row, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let id = self.require_id()?;
        let affected = self.menu.target(id).unset(properties).await?;
        self.absorb(affected)
    }

    /// Re-read the row from the device.
    pub async fn refresh(&mut self) -> Result<&Row, CoreError> {
        let id = self.require_id()?;
        let row = self.menu.filter("id", id.as_str()).find().await?;
        match row {
            Some(row) => {
                self.row = row;
                Ok(&self.row)
            }
            None => Err(self.gone(id)),
        }
    }

    /// Remove the row, returning its last known state.
    pub async fn remove(self) -> Result<Row, CoreError> {
        let id = self.require_id()?;
        let affected = self.menu.target(id.as_str()).remove().await?;
        Ok(affected.into_rows().into_iter().next().unwrap_or(self.row))
    }

    fn require_id(&self) -> Result<String, CoreError> {
        self.row
            .id()
            .map(str::to_owned)
            .ok_or_else(|| CoreError::InvalidData {
                message: format!("row from {} has no id", self.menu.path()),
            })
    }

    fn absorb(&mut self, affected: Affected) -> Result<&Row, CoreError> {
        let id = self.require_id()?;
        match affected.into_rows().into_iter().next() {
            Some(row) => {
                self.row = row;
                Ok(&self.row)
            }
            None => Err(self.gone(id)),
        }
    }

    fn gone(&self, id: String) -> CoreError {
        CoreError::ReferenceNotFound {
            key: ".id".into(),
            menu: self.menu.path().to_string(),
            reference: id,
        }
    }
}
