//! Schema Commands
//!
//! 추출 데이터로 스키마 그리드를 만들어 반환합니다.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::{CommandError, CommandResult};
use crate::schema_grid::{
    collection_name, infer_relations, schemas_from_extracted, GridLayout, RawSchema, SchemaGrid,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaGridArgs {
    /// 표시할 파일/테이블 (비어 있으면 업로드 목록 전체)
    #[serde(default)]
    pub only: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaView {
    pub layout: GridLayout,
    /// 카드별 텍스트 렌더링
    pub blocks: Vec<String>,
}

pub async fn build_schema_grid(args: SchemaGridArgs, state: &AppState) -> CommandResult<SchemaView> {
    let names: Vec<String> = if args.only.is_empty() {
        state
            .registry
            .list()
            .map_err(CommandError::from)?
            .into_iter()
            .filter(|f| f.kind.is_tabular())
            .map(|f| f.name)
            .collect()
    } else {
        args.only
    };
    let displayed = displayed_keys(names);

    let extracted = state.api.get_extracted_data().await;
    let cards = schemas_from_extracted(&extracted);
    let relations = infer_relations(&cards);
    tracing::debug!(
        "[Schema] {} table(s), {} relation(s), {} displayed",
        cards.len(),
        relations.len(),
        displayed.len()
    );

    let raw: Vec<RawSchema> = cards.into_iter().map(RawSchema::from).collect();
    let grid = SchemaGrid::new(raw, relations, &displayed);

    Ok(SchemaView {
        layout: grid.layout(),
        blocks: grid.render(),
    })
}

/// 업로드 파일명과 백엔드 컬렉션 이름 모두로 카드를 찾도록 표시 집합 구성
fn displayed_keys(names: Vec<String>) -> HashSet<String> {
    let mut keys = HashSet::new();
    for name in names {
        let collection = collection_name(&name);
        if !collection.is_empty() {
            keys.insert(collection);
        }
        keys.insert(name);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_displayed_keys_include_collection_names() {
        let keys = displayed_keys(vec!["Q3 Sales.csv".to_string(), "orders".to_string()]);
        assert!(keys.contains("Q3 Sales.csv"));
        assert!(keys.contains("q3_sales"));
        assert!(keys.contains("orders"));
        assert_eq!(keys.len(), 3);
    }
}
