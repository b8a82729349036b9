//! Schema Visualization Grid
//!
//! 추출된 테이블을 카드로 배치하고 카드 사이 관계선을 계산하는 뷰 모델.
//!
//! - 잘못된 스키마 항목은 개별적으로 건너뜀 (그리드 전체는 실패하지 않음)
//! - 표시 집합에 있는 카드만 보여줌 (id 또는 title 일치)
//! - 위치는 화면 전용 상태이며 백엔드로 보내지 않음

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{
    ColumnType, ExtractedFileData, Position, Relation, Row, SchemaCard, SchemaColumn,
};

/// 기본 배치: 2열 그리드
pub const GRID_COLUMNS: usize = 2;
pub const GRID_MARGIN: f64 = 40.0;
pub const COLUMN_PITCH: f64 = 340.0;
pub const ROW_HEIGHT: f64 = 280.0;

pub const CARD_WIDTH: f64 = 280.0;
pub const HEADER_HEIGHT: f64 = 44.0;
pub const FIELD_HEIGHT: f64 = 28.0;

/// 드래그 종료 직후 클릭 무시 시간
pub const CLICK_COOLDOWN: Duration = Duration::from_millis(200);

/// 타입 추론에 사용할 최대 샘플 행 수
const TYPE_SAMPLE_ROWS: usize = 50;

/// 백엔드/파일에서 읽은 가공 전 스키마 항목
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSchema {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<RawColumn>>,
    #[serde(default)]
    pub position: Option<Position>,
}

/// 컬럼은 이름 문자열 또는 `{name, type}` 객체
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawColumn {
    Name(String),
    Typed {
        name: String,
        #[serde(default, rename = "type")]
        column_type: Option<String>,
    },
}

impl RawSchema {
    fn into_card(self) -> Result<SchemaCard, &'static str> {
        let id = self.id.filter(|s| !s.trim().is_empty());
        let title = self.title.filter(|s| !s.trim().is_empty());

        let (id, title) = match (id, title) {
            (Some(id), Some(title)) => (id, title),
            (Some(id), None) => (id.clone(), id),
            (None, Some(title)) => (title.clone(), title),
            (None, None) => return Err("missing id and title"),
        };

        let columns = self.columns.ok_or("missing columns")?;
        let columns = columns
            .into_iter()
            .map(|column| match column {
                RawColumn::Name(name) => SchemaColumn {
                    name,
                    column_type: ColumnType::Unknown,
                },
                RawColumn::Typed { name, column_type } => SchemaColumn {
                    name,
                    column_type: column_type
                        .as_deref()
                        .map(parse_column_type)
                        .unwrap_or(ColumnType::Unknown),
                },
            })
            .collect();

        Ok(SchemaCard {
            id,
            title,
            columns,
            position: self.position,
        })
    }
}

impl From<SchemaCard> for RawSchema {
    fn from(card: SchemaCard) -> Self {
        RawSchema {
            id: Some(card.id),
            title: Some(card.title),
            columns: Some(
                card.columns
                    .into_iter()
                    .map(|c| RawColumn::Typed {
                        name: c.name,
                        column_type: Some(c.column_type.as_str().to_string()),
                    })
                    .collect(),
            ),
            position: card.position,
        }
    }
}

fn parse_column_type(raw: &str) -> ColumnType {
    match raw.to_lowercase().as_str() {
        "text" | "string" | "str" | "object" => ColumnType::Text,
        "integer" | "int" | "int64" | "bigint" => ColumnType::Integer,
        "decimal" | "float" | "float64" | "double" | "number" => ColumnType::Decimal,
        "boolean" | "bool" => ColumnType::Boolean,
        "date" | "datetime" | "timestamp" | "datetime64[ns]" => ColumnType::Date,
        _ => ColumnType::Unknown,
    }
}

/// 표시 순서 index의 기본 위치
pub fn default_position(index: usize) -> Position {
    Position {
        x: GRID_MARGIN + (index % GRID_COLUMNS) as f64 * COLUMN_PITCH,
        y: GRID_MARGIN + (index / GRID_COLUMNS) as f64 * ROW_HEIGHT,
    }
}

/// 두 카드 사이 관계선
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub from_schema: String,
    pub to_schema: String,
    pub from_field: String,
    pub to_field: String,
    pub start: Position,
    pub end: Position,
}

/// JSON 출력용 배치 결과
#[derive(Debug, Clone, Serialize)]
pub struct GridLayout {
    pub cards: Vec<SchemaCard>,
    pub connectors: Vec<Connector>,
}

#[derive(Debug, Clone)]
struct DragState {
    card_id: String,
    pointer_origin: Position,
    card_origin: Position,
}

pub struct SchemaGrid {
    cards: Vec<SchemaCard>,
    relations: Vec<Relation>,
    selected: Option<String>,
    drag: Option<DragState>,
    last_drag_end: Option<Instant>,
}

impl SchemaGrid {
    /// 표시 집합에 속한 유효한 항목만으로 그리드 생성
    pub fn new(raw: Vec<RawSchema>, relations: Vec<Relation>, displayed: &HashSet<String>) -> Self {
        let mut cards = Vec::new();
        for (index, entry) in raw.into_iter().enumerate() {
            match entry.into_card() {
                Ok(card) => {
                    if displayed.contains(&card.id) || displayed.contains(&card.title) {
                        cards.push(card);
                    }
                }
                Err(reason) => {
                    tracing::warn!("[SchemaGrid] Skipping schema entry #{}: {}", index, reason);
                }
            }
        }

        for (index, card) in cards.iter_mut().enumerate() {
            if card.position.is_none() {
                card.position = Some(default_position(index));
            }
        }

        Self {
            cards,
            relations,
            selected: None,
            drag: None,
            last_drag_end: None,
        }
    }

    /// JSON 배열에서 생성 (형식이 맞지 않는 항목은 건너뜀)
    pub fn from_json(
        value: &serde_json::Value,
        relations: Vec<Relation>,
        displayed: &HashSet<String>,
    ) -> Self {
        let raw = match value {
            serde_json::Value::Array(items) => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    match serde_json::from_value::<RawSchema>(item.clone()) {
                        Ok(entry) => Some(entry),
                        Err(e) => {
                            tracing::warn!("[SchemaGrid] Skipping schema entry #{}: {}", index, e);
                            None
                        }
                    }
                })
                .collect(),
            _ => {
                tracing::warn!("[SchemaGrid] Schema list is not an array");
                Vec::new()
            }
        };
        Self::new(raw, relations, displayed)
    }

    pub fn cards(&self) -> &[SchemaCard] {
        &self.cards
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn find(&self, key: &str) -> Option<&SchemaCard> {
        self.cards.iter().find(|c| c.id == key || c.title == key)
    }

    pub fn position_of(&self, key: &str) -> Option<Position> {
        self.find(key).and_then(|c| c.position)
    }

    /// 카드 드래그 시작 (없는 카드면 false)
    pub fn begin_drag(&mut self, card_id: &str, pointer: Position) -> bool {
        let Some(card) = self.find(card_id) else {
            return false;
        };
        let card_origin = card.position.unwrap_or(Position { x: 0.0, y: 0.0 });
        self.drag = Some(DragState {
            card_id: card.id.clone(),
            pointer_origin: pointer,
            card_origin,
        });
        true
    }

    /// 드래그 중인 카드만 이동
    pub fn drag_to(&mut self, pointer: Position) {
        let Some(drag) = &self.drag else {
            return;
        };
        let new_position = Position {
            x: drag.card_origin.x + (pointer.x - drag.pointer_origin.x),
            y: drag.card_origin.y + (pointer.y - drag.pointer_origin.y),
        };
        let card_id = drag.card_id.clone();
        if let Some(card) = self.cards.iter_mut().find(|c| c.id == card_id) {
            card.position = Some(new_position);
        }
    }

    pub fn end_drag(&mut self, at: Instant) {
        if self.drag.take().is_some() {
            self.last_drag_end = Some(at);
        }
    }

    /// 카드 클릭. 드래그 직후 쿨다운 안이면 선택하지 않음
    pub fn click(&mut self, card_id: &str, at: Instant) -> bool {
        if let Some(ended) = self.last_drag_end {
            if at.saturating_duration_since(ended) < CLICK_COOLDOWN {
                tracing::debug!("[SchemaGrid] Click ignored during drag cooldown");
                return false;
            }
        }
        let Some(card) = self.find(card_id) else {
            return false;
        };
        self.selected = Some(card.id.clone());
        true
    }

    /// 양쪽 카드가 모두 표시된 관계에 대해서만 관계선 계산
    pub fn connectors(&self) -> Vec<Connector> {
        self.relations
            .iter()
            .filter_map(|relation| {
                let from = self.find(&relation.from_schema)?;
                let to = self.find(&relation.to_schema)?;
                let from_pos = from.position?;
                let to_pos = to.position?;

                let from_is_left = from_pos.x <= to_pos.x;
                let (from_x, to_x) = if from_is_left {
                    (from_pos.x + CARD_WIDTH, to_pos.x)
                } else {
                    (from_pos.x, to_pos.x + CARD_WIDTH)
                };

                Some(Connector {
                    from_schema: from.id.clone(),
                    to_schema: to.id.clone(),
                    from_field: relation.from_field.clone(),
                    to_field: relation.to_field.clone(),
                    start: Position {
                        x: from_x,
                        y: field_anchor_y(from, &relation.from_field),
                    },
                    end: Position {
                        x: to_x,
                        y: field_anchor_y(to, &relation.to_field),
                    },
                })
            })
            .collect()
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout {
            cards: self.cards.clone(),
            connectors: self.connectors(),
        }
    }

    /// 카드별로 독립 렌더링, 실패한 카드는 자리표시자로 대체
    pub fn render(&self) -> Vec<String> {
        self.cards
            .iter()
            .map(|card| match render_card(card) {
                Ok(block) => block,
                Err(e) => {
                    tracing::warn!("[SchemaGrid] Failed to render {}: {}", card.id, e);
                    render_placeholder(card)
                }
            })
            .collect()
    }
}

/// 필드 행의 세로 중심 (모르는 필드면 헤더 중심)
fn field_anchor_y(card: &SchemaCard, field: &str) -> f64 {
    let top = card.position.map(|p| p.y).unwrap_or(0.0);
    match card.columns.iter().position(|c| c.name == field) {
        Some(row) => top + HEADER_HEIGHT + row as f64 * FIELD_HEIGHT + FIELD_HEIGHT / 2.0,
        None => top + HEADER_HEIGHT / 2.0,
    }
}

/// 카드 하나를 텍스트 블록으로
pub fn render_card(card: &SchemaCard) -> Result<String, AppError> {
    if let Some(index) = card.columns.iter().position(|c| c.name.trim().is_empty()) {
        return Err(AppError::InvalidOperation(format!(
            "column #{} of {} has no name",
            index, card.title
        )));
    }

    let name_width = card
        .columns
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);
    let type_width = card
        .columns
        .iter()
        .map(|c| c.column_type.as_str().len())
        .max()
        .unwrap_or(0);
    let inner = (name_width + type_width + 3).max(card.title.chars().count() + 2);

    let mut lines = Vec::with_capacity(card.columns.len() + 4);
    lines.push(format!("+{}+", "-".repeat(inner)));
    lines.push(format!("| {:<width$} |", card.title, width = inner - 2));
    lines.push(format!("+{}+", "=".repeat(inner)));
    if card.columns.is_empty() {
        lines.push(format!("| {:<width$} |", "(no columns)", width = inner - 2));
    }
    for column in &card.columns {
        let row = format!(
            "{:<nw$} : {}",
            column.name,
            column.column_type.as_str(),
            nw = name_width
        );
        lines.push(format!("| {:<width$}|", row, width = inner - 1));
    }
    lines.push(format!("+{}+", "-".repeat(inner)));
    Ok(lines.join("\n"))
}

fn render_placeholder(card: &SchemaCard) -> String {
    format!("[ {}: unable to display this table ]", card.title)
}

/// 추출 데이터에서 스키마 카드 생성 (행이 없는 문서는 제외)
///
/// 백엔드는 저장된 청크마다 항목을 하나씩 돌려주므로 같은 파일명의
/// 항목은 한 카드로 합칩니다.
pub fn schemas_from_extracted(data: &[ExtractedFileData]) -> Vec<SchemaCard> {
    let mut tables: Vec<(&str, Vec<&Row>)> = Vec::new();
    for file in data.iter().filter(|file| !file.content.is_empty()) {
        match tables.iter().position(|(name, _)| *name == file.file_name) {
            Some(index) => tables[index].1.extend(file.content.iter()),
            None => tables.push((file.file_name.as_str(), file.content.iter().collect())),
        }
    }

    tables
        .into_iter()
        .map(|(file_name, rows)| {
            let mut names: Vec<String> = Vec::new();
            for row in &rows {
                for key in row.keys() {
                    if !names.iter().any(|n| n == key) {
                        names.push(key.clone());
                    }
                }
            }

            let columns = names
                .into_iter()
                .map(|name| {
                    let column_type = infer_column_type(&rows, &name);
                    SchemaColumn { name, column_type }
                })
                .collect();

            SchemaCard {
                id: file_name.to_string(),
                title: table_title(file_name),
                columns,
                position: None,
            }
        })
        .collect()
}

/// 업로드 파일명을 백엔드 컬렉션 이름으로 변환
///
/// 확장자를 떼고 영숫자가 아닌 문자는 `_`로 바꾼 뒤 소문자로 만들고
/// 양 끝의 `_`를 제거합니다. (`Q3 Sales.csv` → `q3_sales`)
pub fn collection_name(file_name: &str) -> String {
    let stem = table_title(file_name);
    let replaced: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    replaced.to_lowercase().trim_matches('_').to_string()
}

/// 파일명에서 확장자를 뗀 테이블 이름
fn table_title(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string()
}

fn infer_column_type(rows: &[&Row], column: &str) -> ColumnType {
    let samples: Vec<&serde_json::Value> = rows
        .iter()
        .take(TYPE_SAMPLE_ROWS)
        .filter_map(|row| row.get(column))
        .filter(|v| !v.is_null() && v.as_str().map(|s| !s.trim().is_empty()).unwrap_or(true))
        .collect();

    if samples.is_empty() {
        return ColumnType::Unknown;
    }

    let all = |f: fn(&serde_json::Value) -> bool| samples.iter().all(|v| f(v));

    if all(is_boolean) {
        ColumnType::Boolean
    } else if all(is_integer) {
        ColumnType::Integer
    } else if all(is_number) {
        ColumnType::Decimal
    } else if all(is_date) {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

fn is_boolean(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(_) => true,
        serde_json::Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "false"),
        _ => false,
    }
}

fn is_integer(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Number(n) => n.is_i64() || n.is_u64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_number(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Number(_) => true,
        serde_json::Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

fn is_date(value: &serde_json::Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    let s = s.trim();
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
        || chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_identifier(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower == "id" || lower.ends_with("_id")
}

/// `customer_id` 접두사가 `customers` 같은 테이블 이름을 가리키는지
fn refers_to(prefix: &str, card: &SchemaCard) -> bool {
    let title = card.title.to_lowercase();
    let prefix = prefix.to_lowercase();
    title == prefix || title == format!("{}s", prefix) || title == format!("{}es", prefix)
}

/// 식별자형 컬럼을 공유하는 카드 사이의 관계 추정
pub fn infer_relations(cards: &[SchemaCard]) -> Vec<Relation> {
    let mut relations: Vec<Relation> = Vec::new();
    let mut seen: HashSet<(String, String, String, String)> = HashSet::new();

    let mut push = |relation: Relation| {
        let key = (
            relation.from_schema.clone(),
            relation.to_schema.clone(),
            relation.from_field.clone(),
            relation.to_field.clone(),
        );
        if seen.insert(key) {
            relations.push(relation);
        }
    };

    for (i, from) in cards.iter().enumerate() {
        for (j, to) in cards.iter().enumerate() {
            if i == j {
                continue;
            }
            for column in from.columns.iter().filter(|c| is_identifier(&c.name)) {
                let lower = column.name.to_lowercase();

                // orders.customer_id → customers.id
                if let Some(prefix) = lower.strip_suffix("_id") {
                    if refers_to(prefix, to) {
                        if let Some(target) = to.columns.iter().find(|c| c.name.eq_ignore_ascii_case("id")) {
                            push(Relation {
                                from_schema: from.id.clone(),
                                to_schema: to.id.clone(),
                                from_field: column.name.clone(),
                                to_field: target.name.clone(),
                            });
                            continue;
                        }
                    }
                }

                // 같은 이름의 외래키 컬럼 공유 (한 방향만)
                if i < j && lower != "id" {
                    if let Some(target) = to.columns.iter().find(|c| c.name.eq_ignore_ascii_case(&column.name)) {
                        push(Relation {
                            from_schema: from.id.clone(),
                            to_schema: to.id.clone(),
                            from_field: column.name.clone(),
                            to_field: target.name.clone(),
                        });
                    }
                }
            }
        }
    }

    relations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractedMetadata;
    use serde_json::json;

    fn displayed(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|s| s.to_string()).collect()
    }

    fn schemas() -> serde_json::Value {
        json!([
            {"id": "orders.csv", "title": "orders", "columns": ["id", "customer_id", "total"]},
            {"columns": ["broken"]},
            {"id": "customers.csv", "title": "customers", "columns": [{"name": "id", "type": "int"}, {"name": "name", "type": "string"}]},
            {"id": "products.csv", "title": "products", "columns": ["id", "price"]}
        ])
    }

    #[test]
    fn test_entry_missing_id_and_title_is_skipped() {
        let grid = SchemaGrid::from_json(
            &schemas(),
            Vec::new(),
            &displayed(&["orders", "customers.csv", "products"]),
        );
        let ids: Vec<&str> = grid.cards().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["orders.csv", "customers.csv", "products.csv"]);
        assert_eq!(grid.cards()[1].columns[0].column_type, ColumnType::Integer);
    }

    #[test]
    fn test_non_object_entry_is_skipped() {
        let value = json!([42, {"id": "a", "title": "a", "columns": []}]);
        let grid = SchemaGrid::from_json(&value, Vec::new(), &displayed(&["a"]));
        assert_eq!(grid.cards().len(), 1);
    }

    #[test]
    fn test_empty_displayed_set_shows_nothing() {
        let grid = SchemaGrid::from_json(&schemas(), Vec::new(), &HashSet::new());
        assert!(grid.cards().is_empty());
    }

    #[test]
    fn test_default_layout_is_two_columns() {
        let grid = SchemaGrid::from_json(
            &schemas(),
            Vec::new(),
            &displayed(&["orders", "customers", "products"]),
        );
        assert_eq!(grid.position_of("orders"), Some(default_position(0)));
        assert_eq!(grid.position_of("customers"), Some(default_position(1)));
        let third = grid.position_of("products").unwrap();
        assert_eq!(third.x, GRID_MARGIN);
        assert_eq!(third.y, GRID_MARGIN + ROW_HEIGHT);
    }

    #[test]
    fn test_explicit_position_wins() {
        let value = json!([{"id": "a", "title": "a", "columns": [], "position": {"x": 5.0, "y": 7.0}}]);
        let grid = SchemaGrid::from_json(&value, Vec::new(), &displayed(&["a"]));
        assert_eq!(grid.position_of("a"), Some(Position { x: 5.0, y: 7.0 }));
    }

    #[test]
    fn test_drag_moves_only_the_dragged_card() {
        let mut grid = SchemaGrid::from_json(
            &schemas(),
            Vec::new(),
            &displayed(&["orders", "customers"]),
        );
        let before_other = grid.position_of("customers");
        let start = grid.position_of("orders").unwrap();

        assert!(grid.begin_drag("orders", Position { x: 100.0, y: 100.0 }));
        grid.drag_to(Position { x: 130.0, y: 90.0 });
        grid.end_drag(Instant::now());

        assert_eq!(
            grid.position_of("orders"),
            Some(Position { x: start.x + 30.0, y: start.y - 10.0 })
        );
        assert_eq!(grid.position_of("customers"), before_other);
    }

    #[test]
    fn test_click_suppressed_during_cooldown() {
        let mut grid = SchemaGrid::from_json(&schemas(), Vec::new(), &displayed(&["orders"]));
        let ended = Instant::now();
        grid.begin_drag("orders", Position { x: 0.0, y: 0.0 });
        grid.end_drag(ended);

        assert!(!grid.click("orders", ended + Duration::from_millis(50)));
        assert_eq!(grid.selected(), None);

        assert!(grid.click("orders", ended + Duration::from_millis(250)));
        assert_eq!(grid.selected(), Some("orders.csv"));
    }

    #[test]
    fn test_relation_to_hidden_schema_has_no_connector() {
        let relations = vec![
            Relation {
                from_schema: "orders.csv".into(),
                to_schema: "customers.csv".into(),
                from_field: "customer_id".into(),
                to_field: "id".into(),
            },
            Relation {
                from_schema: "orders.csv".into(),
                to_schema: "missing.csv".into(),
                from_field: "id".into(),
                to_field: "id".into(),
            },
        ];
        let grid = SchemaGrid::from_json(&schemas(), relations, &displayed(&["orders", "customers"]));
        let connectors = grid.connectors();
        assert_eq!(connectors.len(), 1);

        let connector = &connectors[0];
        let orders = grid.position_of("orders").unwrap();
        assert_eq!(connector.start.x, orders.x + CARD_WIDTH);
        assert_eq!(
            connector.start.y,
            orders.y + HEADER_HEIGHT + FIELD_HEIGHT + FIELD_HEIGHT / 2.0
        );
    }

    #[test]
    fn test_failed_card_renders_placeholder_only() {
        let value = json!([
            {"id": "ok", "title": "ok", "columns": ["a"]},
            {"id": "bad", "title": "bad", "columns": ["  "]}
        ]);
        let grid = SchemaGrid::from_json(&value, Vec::new(), &displayed(&["ok", "bad"]));
        let blocks = grid.render();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("| ok"));
        assert_eq!(blocks[1], "[ bad: unable to display this table ]");
    }

    #[test]
    fn test_schemas_from_extracted_infers_types() {
        let rows: Vec<Row> = vec![
            json!({"id": 1, "price": 9.5, "sold_on": "2024-01-03", "active": true}),
            json!({"id": 2, "price": 3, "sold_on": "2024-01-04", "active": false, "note": "x"}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();
        let data = vec![
            ExtractedFileData {
                file_name: "sales.csv".into(),
                content: rows,
                metadata: ExtractedMetadata::default(),
            },
            ExtractedFileData {
                file_name: "memo.pdf".into(),
                content: Vec::new(),
                metadata: ExtractedMetadata::default(),
            },
        ];

        let cards = schemas_from_extracted(&data);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "sales");
        let types: Vec<(&str, ColumnType)> = cards[0]
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.column_type))
            .collect();
        assert_eq!(
            types,
            vec![
                ("id", ColumnType::Integer),
                ("price", ColumnType::Decimal),
                ("sold_on", ColumnType::Date),
                ("active", ColumnType::Boolean),
                ("note", ColumnType::Text),
            ]
        );
    }

    #[test]
    fn test_infer_relations_links_foreign_keys() {
        let card = |id: &str, title: &str, cols: &[&str]| SchemaCard {
            id: id.into(),
            title: title.into(),
            columns: cols
                .iter()
                .map(|n| SchemaColumn { name: n.to_string(), column_type: ColumnType::Integer })
                .collect(),
            position: None,
        };
        let cards = vec![
            card("orders.csv", "orders", &["id", "customer_id"]),
            card("customers.csv", "customers", &["id", "name"]),
            card("payments.csv", "payments", &["id", "customer_id"]),
        ];

        let relations = infer_relations(&cards);
        assert!(relations.contains(&Relation {
            from_schema: "orders.csv".into(),
            to_schema: "customers.csv".into(),
            from_field: "customer_id".into(),
            to_field: "id".into(),
        }));
        assert!(relations.contains(&Relation {
            from_schema: "orders.csv".into(),
            to_schema: "payments.csv".into(),
            from_field: "customer_id".into(),
            to_field: "customer_id".into(),
        }));
        assert!(!relations.iter().any(|r| r.from_field == "id" && r.to_field == "id"));
    }

    #[test]
    fn test_chunk_entries_merge_into_one_card() {
        let chunk = |v: serde_json::Value| -> ExtractedFileData {
            ExtractedFileData {
                file_name: "sales".into(),
                content: vec![v.as_object().cloned().unwrap()],
                metadata: ExtractedMetadata::default(),
            }
        };
        let data = vec![
            chunk(json!({"id": 1, "region": "north"})),
            chunk(json!({"id": 2, "amount": 10.5})),
        ];

        let cards = schemas_from_extracted(&data);
        assert_eq!(cards.len(), 1);
        let names: Vec<&str> = cards[0].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "region", "amount"]);

        let raw: Vec<RawSchema> = cards.into_iter().map(RawSchema::from).collect();
        let mut grid = SchemaGrid::new(raw, Vec::new(), &displayed(&["sales"]));
        assert_eq!(grid.cards().len(), 1);
        assert!(grid.begin_drag("sales", Position { x: 0.0, y: 0.0 }));
        grid.drag_to(Position { x: 100.0, y: 50.0 });
        assert_eq!(grid.position_of("sales"), Some(Position { x: 140.0, y: 90.0 }));
    }

    #[test]
    fn test_collection_name_matches_backend_naming() {
        assert_eq!(collection_name("sales.csv"), "sales");
        assert_eq!(collection_name("Q3 Sales-2024.xlsx"), "q3_sales_2024");
        assert_eq!(collection_name("_draft_.csv"), "draft");
    }
}
