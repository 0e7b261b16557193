use super::format::{parse_int, parse_number};
use super::scan::Line;

/// Key of a table row: a one-based component index, the `all` total row, or a
/// row that names its component only by symbol until [`Table::resolve_symbols`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKey {
    Component(usize),
    Total,
    Unindexed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub key: RowKey,
    pub symbol: Option<String>,
    pub line: usize,
    values: Vec<f64>,
}

/// Header tokens that name the key column rather than a value column.
const KEY_COLUMNS: &[&str] = &["cpt", "symbol", "element", "species", "component"];

/// Element symbols as they lead a row: `W`, `Ar`, `D`.
fn is_symbol(token: &str) -> bool {
    token.len() <= 3
        && token.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// A column table as printed in reports.
///
/// Rows are keyed by a component index, by a symbol, or by `all`. A header line
/// starting with `cpt` names the columns; index-keyed rows may carry a symbol
/// before their values. Tables printed without a `cpt` header fall back to
/// positional columns and skip their caption lines. Lines starting with `no `
/// are placeholders that stand in for the whole table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    positional: bool,
    rows: Vec<TableRow>,
    placeholder: Option<String>,
    errors: Vec<(usize, String)>,
}

impl Table {
    pub fn parse<'a>(lines: impl IntoIterator<Item = &'a Line>) -> Self {
        Self::parse_with(lines, &[])
    }

    /// Parses a table whose columns are `fallback` unless a `cpt` header names them.
    ///
    /// Until a header or a first row is seen, lines that are not rows are taken
    /// as captions; after that they are recorded as errors.
    pub fn parse_with<'a>(lines: impl IntoIterator<Item = &'a Line>, fallback: &[&str]) -> Self {
        let mut table = Table {
            columns: fallback.iter().map(|c| c.to_string()).collect(),
            positional: !fallback.is_empty(),
            ..Table::default()
        };
        let mut strict = false;
        for line in lines {
            let lowered = line.text.to_lowercase();
            if lowered.starts_with("cpt") {
                table.set_header(&lowered);
                strict = true;
            } else if lowered.starts_with("no ") {
                table.placeholder = Some(lowered);
            } else if !table.columns.is_empty() {
                match table.parse_row(line) {
                    Ok(row) => {
                        strict = true;
                        table.rows.push(row);
                    }
                    Err(details) if strict => table.errors.push((line.number, details)),
                    Err(_) => {}
                }
            }
        }
        table
    }

    fn set_header(&mut self, lowered: &str) {
        self.columns = lowered
            .split_whitespace()
            .filter(|name| !KEY_COLUMNS.contains(name))
            .map(str::to_string)
            .collect();
        self.positional = false;
    }

    fn parse_row(&self, line: &Line) -> Result<TableRow, String> {
        let tokens: Vec<&str> = line.text.split_whitespace().collect();
        let width = self.columns.len();
        let Some((first, rest)) = tokens.split_first() else {
            return Err("empty row".to_string());
        };
        let key = if first.eq_ignore_ascii_case("all") {
            RowKey::Total
        } else if let Some(index) = parse_int(first) {
            if index <= 0 {
                return Err(format!("invalid row key '{first}'"));
            }
            return self.indexed_row(line, index as usize, rest);
        } else if is_symbol(first) {
            RowKey::Unindexed
        } else {
            return Err(format!("invalid row key '{first}'"));
        };
        let values: Vec<f64> = rest.iter().map_while(|token| parse_number(token)).collect();
        let required = if self.positional { 1 } else { width };
        if values.len() < required {
            return Err(format!(
                "expected {required} values, found {} in '{}'",
                values.len(),
                line.text
            ));
        }
        Ok(TableRow {
            key,
            symbol: (key == RowKey::Unindexed).then(|| first.to_string()),
            line: line.number,
            values,
        })
    }

    /// `<index> [symbol] <values>`: the values are the trailing tokens.
    fn indexed_row(&self, line: &Line, index: usize, rest: &[&str]) -> Result<TableRow, String> {
        let width = self.columns.len();
        let required = if self.positional { 1 } else { width };
        if rest.len() < required {
            return Err(format!(
                "expected {required} values, found {} in '{}'",
                rest.len(),
                line.text
            ));
        }
        let (label, numbers) = if self.positional {
            match rest.first() {
                Some(token) if parse_number(token).is_none() => rest.split_at(1),
                _ => rest.split_at(0),
            }
        } else {
            rest.split_at(rest.len() - width)
        };
        let values = numbers
            .iter()
            .map(|token| parse_number(token).ok_or_else(|| format!("invalid number '{token}'")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TableRow {
            key: RowKey::Component(index),
            symbol: (!label.is_empty()).then(|| label.join(" ")),
            line: line.number,
            values,
        })
    }

    /// Gives every symbol-keyed row the component index `index_of` assigns it.
    pub fn resolve_symbols(&mut self, mut index_of: impl FnMut(&str) -> usize) {
        for row in &mut self.rows {
            if let (RowKey::Unindexed, Some(symbol)) = (row.key, &row.symbol) {
                row.key = RowKey::Component(index_of(symbol));
            }
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn component_rows(&self) -> impl Iterator<Item = (usize, &TableRow)> {
        self.rows.iter().filter_map(|row| match row.key {
            RowKey::Component(index) => Some((index, row)),
            RowKey::Total | RowKey::Unindexed => None,
        })
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    /// Rows that could not be parsed, as `(line, details)`.
    pub fn errors(&self) -> &[(usize, String)] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, key: RowKey, column: &str) -> Option<f64> {
        let position = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|row| row.key == key)
            .and_then(|row| row.values.get(position).copied())
    }

    pub fn row_value(&self, row: &TableRow, column: &str) -> Option<f64> {
        let position = self.columns.iter().position(|c| c == column)?;
        row.values.get(position).copied()
    }
}

/// Splits a line of the form `k1 = v1   k2 = v2` into lowercase keys and raw values.
///
/// Each value is the first token after its `=`; whatever follows belongs to the
/// next key.
pub fn key_values(text: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut parts = text.split('=');
    let Some(first) = parts.next() else {
        return pairs;
    };
    let mut key = first.trim().to_lowercase();
    for part in parts {
        let part = part.trim();
        let (value, next) = match part.split_once(char::is_whitespace) {
            Some((value, next)) => (value, next.trim()),
            None => (part, ""),
        };
        if !key.is_empty() {
            pairs.push((key, value.to_string()));
        }
        key = next.to_lowercase();
    }
    pairs
}

/// Reads a line of column names followed by a line of values, e.g. `ncp nh` / `2 1000`.
///
/// The names line is the first whose leading token equals `first`.
pub fn named_values(lines: &[Line], first: &str) -> Option<Vec<(String, String)>> {
    let position = lines.iter().position(|line| {
        line.text
            .split_whitespace()
            .next()
            .is_some_and(|token| token.eq_ignore_ascii_case(first))
    })?;
    let names = lines[position].text.split_whitespace();
    let values = lines.get(position + 1)?.text.split_whitespace();
    Some(
        names
            .map(str::to_lowercase)
            .zip(values.map(str::to_string))
            .collect(),
    )
}
