// In-memory RouterOS-like device for integration tests.
//
// Keeps per-menu row lists, evaluates `?` query stacks, and implements the
// commands the engine sends. Every sentence is logged for assertions.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tikly_api::{
    Combinator, Error, PacketStream, QueryWord, RawRow, Transport, Word, WriteFuture,
};
use tikly_core::Session;

type Packets = Vec<Result<RawRow, String>>;

#[derive(Default)]
struct State {
    menus: HashMap<String, Vec<RawRow>>,
    next_id: u32,
    log: Vec<Vec<String>>,
    fail_next: Option<Error>,
    streams: HashMap<String, (Packets, bool)>,
}

#[derive(Default)]
pub struct MockDevice {
    state: Mutex<State>,
}

pub fn raw(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn session(self: &Arc<Self>) -> Session {
        Session::new(Arc::clone(self) as Arc<dyn Transport>)
    }

    /// Add rows to `menu`, assigning ids to rows without one.
    pub fn seed(&self, menu: &str, rows: &[&[(&str, &str)]]) -> Vec<String> {
        let mut state = self.state.lock().unwrap();
        let mut ids = Vec::new();
        for pairs in rows {
            let mut row = raw(pairs);
            let id = if let Some(id) = row.get(".id").cloned() {
                id
            } else {
                state.next_id += 1;
                let id = format!("*{:X}", state.next_id);
                row.shift_insert(0, ".id".into(), id.clone());
                id
            };
            ids.push(id);
            state.menus.entry(menu.to_owned()).or_default().push(row);
        }
        ids
    }

    pub fn rows(&self, menu: &str) -> Vec<RawRow> {
        self.state
            .lock()
            .unwrap()
            .menus
            .get(menu)
            .cloned()
            .unwrap_or_default()
    }

    pub fn ids(&self, menu: &str) -> Vec<String> {
        self.rows(menu)
            .into_iter()
            .filter_map(|r| r.get(".id").cloned())
            .collect()
    }

    pub fn log(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }

    /// Logged sentences whose command ends with `/{action}`.
    pub fn sentences(&self, action: &str) -> Vec<Vec<String>> {
        let suffix = format!("/{action}");
        self.log()
            .into_iter()
            .filter(|s| s.first().is_some_and(|c| c.ends_with(&suffix)))
            .collect()
    }

    /// Make the next write fail with `err`.
    pub fn fail_next(&self, err: Error) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    /// Packets delivered when `command` is streamed. With `keep_open` the
    /// channel stays open until the consumer stops it.
    pub fn preset_stream(&self, command: &str, packets: Packets, keep_open: bool) {
        self.state
            .lock()
            .unwrap()
            .streams
            .insert(command.to_owned(), (packets, keep_open));
    }

    fn handle(&self, sentence: &[String]) -> Result<Vec<RawRow>, Error> {
        let mut state = self.state.lock().unwrap();
        state.log.push(sentence.to_vec());
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }

        let command = sentence.first().ok_or_else(|| Error::Malformed {
            message: "empty sentence".into(),
        })?;
        let (menu, action) = command
            .rsplit_once('/')
            .ok_or_else(|| Error::trap("no such command"))?;

        let mut attrs: Vec<(String, String)> = Vec::new();
        let mut queries: Vec<String> = Vec::new();
        for word in &sentence[1..] {
            match Word::parse(word) {
                Word::Attribute { key, value } => attrs.push((key.into(), value.into())),
                Word::Query(_) => queries.push(word.clone()),
                _ => return Err(Error::trap(format!("unknown parameter {word}"))),
            }
        }
        let attr = |key: &str| {
            attrs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        let targets = || -> Vec<String> {
            attr("numbers")
                .or_else(|| attr(".id"))
                .map(|v| v.split(',').filter(|s| !s.is_empty()).map(str::to_owned).collect())
                .unwrap_or_default()
        };

        let state = &mut *state;
        let rows = state.menus.entry(menu.to_owned()).or_default();

        match action {
            "print" | "getall" => {
                let matched: Vec<RawRow> = rows
                    .iter()
                    .filter(|row| matches(row, &queries))
                    .cloned()
                    .collect();
                if attr("count-only").is_some() {
                    return Ok(vec![raw(&[("ret", &matched.len().to_string())])]);
                }
                let Some(fields) = attr(".proplist") else {
                    return Ok(matched);
                };
                let fields: Vec<&str> = fields.split(',').collect();
                Ok(matched
                    .into_iter()
                    .map(|row| {
                        row.into_iter()
                            .filter(|(k, _)| fields.contains(&k.as_str()))
                            .collect()
                    })
                    .collect())
            }
            "add" => {
                state.next_id += 1;
                let id = format!("*{:X}", state.next_id);
                let mut row = RawRow::new();
                row.insert(".id".into(), id.clone());
                for (key, value) in &attrs {
                    if key != "place-before" {
                        row.insert(key.clone(), stored(value));
                    }
                }
                row.entry("disabled".into()).or_insert_with(|| "false".into());
                let position = attr("place-before")
                    .and_then(|before| position(rows, &before))
                    .unwrap_or(rows.len());
                rows.insert(position, row);
                Ok(vec![raw(&[("ret", &id)])])
            }
            "set" | "enable" | "disable" | "unset" => {
                let ids = targets();
                let ids = if ids.is_empty() && rows.len() == 1 {
                    vec![rows[0].get(".id").cloned().unwrap_or_default()]
                } else {
                    ids
                };
                for id in &ids {
                    let index = position(rows, id).ok_or_else(|| Error::trap("no such item"))?;
                    let row = &mut rows[index];
                    match action {
                        "enable" => {
                            row.insert("disabled".into(), "false".into());
                        }
                        "disable" => {
                            row.insert("disabled".into(), "true".into());
                        }
                        "unset" => {
                            let name = attr("value-name").unwrap_or_default();
                            row.shift_remove(&name);
                        }
                        _ => {
                            for (key, value) in &attrs {
                                if key != "numbers" && key != ".id" {
                                    row.insert(key.clone(), stored(value));
                                }
                            }
                        }
                    }
                }
                Ok(Vec::new())
            }
            "remove" => {
                for id in targets() {
                    let index = position(rows, &id).ok_or_else(|| Error::trap("no such item"))?;
                    rows.remove(index);
                }
                Ok(Vec::new())
            }
            "move" => {
                let ids = targets();
                let mut moving = Vec::new();
                for id in &ids {
                    let index = position(rows, id).ok_or_else(|| Error::trap("no such item"))?;
                    moving.push(rows.remove(index));
                }
                let at = attr("destination")
                    .and_then(|dest| position(rows, &dest))
                    .unwrap_or(rows.len());
                for (offset, row) in moving.into_iter().enumerate() {
                    rows.insert(at + offset, row);
                }
                Ok(Vec::new())
            }
            _ => Err(Error::trap("no such command")),
        }
    }
}

impl Transport for MockDevice {
    fn write(&self, sentence: Vec<String>) -> WriteFuture<'_> {
        Box::pin(async move { self.handle(&sentence) })
    }

    fn stream(&self, sentence: Vec<String>) -> Result<PacketStream, Error> {
        let preset = {
            let mut state = self.state.lock().unwrap();
            state.log.push(sentence.clone());
            sentence
                .first()
                .and_then(|command| state.streams.remove(command))
        };
        let (packets, keep_open) = preset.ok_or_else(|| Error::trap("no such command"))?;
        let (tx, rx) = PacketStream::channel(tikly_api::STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            for packet in packets {
                if !tx.send(packet.map_err(Error::trap)).await {
                    return;
                }
            }
            if keep_open {
                tx.cancelled().await;
            }
        });
        Ok(rx)
    }
}

fn stored(value: &str) -> String {
    match value {
        "yes" => "true".into(),
        "no" => "false".into(),
        other => other.into(),
    }
}

fn position(rows: &[RawRow], id: &str) -> Option<usize> {
    rows.iter()
        .position(|row| row.get(".id").map(String::as_str) == Some(id))
}

fn compare(row: &RawRow, key: &str, value: &str, greater: bool) -> bool {
    let Some(actual) = row.get(key) else {
        return false;
    };
    if value.is_empty() {
        return greater && !actual.is_empty();
    }
    match (actual.parse::<f64>(), value.parse::<f64>()) {
        (Ok(a), Ok(b)) if greater => a > b,
        (Ok(a), Ok(b)) => a < b,
        _ if greater => actual.as_str() > value,
        _ => actual.as_str() < value,
    }
}

/// Evaluate a query stack; remaining values are ANDed.
fn matches(row: &RawRow, queries: &[String]) -> bool {
    let mut stack: Vec<bool> = Vec::new();
    for word in queries {
        let Word::Query(query) = Word::parse(word) else {
            continue;
        };
        match query {
            QueryWord::Equals { key, value } => {
                stack.push(row.get(key).map(String::as_str) == Some(stored(value).as_str()));
            }
            QueryWord::Greater { key, value } => stack.push(compare(row, key, value, true)),
            QueryWord::Less { key, value } => stack.push(compare(row, key, value, false)),
            QueryWord::Has { key } => stack.push(row.contains_key(key)),
            QueryWord::Lacks { key } => {
                stack.push(row.get(key).is_none_or(String::is_empty));
            }
            QueryWord::Operators(ops) => {
                for op in ops {
                    match op {
                        Combinator::Not => {
                            let top = stack.pop().unwrap_or(true);
                            stack.push(!top);
                        }
                        Combinator::Or | Combinator::And => {
                            let b = stack.pop().unwrap_or(true);
                            let a = stack.pop().unwrap_or(true);
                            stack.push(if op == Combinator::Or { a || b } else { a && b });
                        }
                    }
                }
            }
        }
    }
    stack.into_iter().all(|v| v)
}
