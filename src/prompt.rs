//! Prompt assembly for JSON-query generation.
//!
//! `compose` is a pure function: identical schema, retrieved context, and
//! question always yield a byte-identical prompt. The target question is
//! referenced only in the trailing restatement, so everything before it is
//! stable across questions for a given schema and context.

use std::fmt::Write;
use serde_json::Value;

use crate::index::RetrievedExample;

/// Persona and schema framing. `compose` appends the serialized schema.
const INSTRUCTION_PREAMBLE: &str =
    "You are an expert in generating JSON queries for a search interface based on user questions. ";

/// The exact output shape demanded from the model, field by field.
const STRUCTURE_BLOCK: &str = r#"The JSON object MUST follow this EXACT structure:
{
  "version": {"majorRelease": <int>, "minorRelease": <int>, "patch": <int>},
  "sortColumn": {"logicalName": <string>, "isAscSortOrder": <boolean>},
  "sectionsList": [{"objectName": "Account", "label": "Account DETAILS", "isListView": false, "fieldsList": [{"logicalName": <string>, "operator": "=", "value": <string>, "type": <string>, "targetObject": "Account", "showRadiusDistance": false, "isListView": false, "isLabelEdited": false}]}],
  "resultColumns": [{"logicalName": <string>, "type": <string>, "targetObject": "Account", "label": <string>, "isSortable": <boolean>, "isRadiusDistance": false, "attribute": <string>}],
  "matchAnySection": false,
  "mapData": {"zoom": 3.0, "data": {}, "center": {"lat": 42.87596410238256, "lng": -59.76562500000001}}
}
"#;

/// Extraction rules: field/value extraction, per-field type inference,
/// default sort, and the strict-JSON-only output contract.
const RULES_BLOCK: &str = r#"Rules:
- Extract fields (e.g., 'Name', 'Site', 'Phone', 'OwnerId', 'Description') and values from the question.
- Set 'logicalName' and 'attribute' to the field name (e.g., 'Name', 'Site').
- Set 'type' based on the field: 'string' for Name/Site, 'phone' for Phone, 'reference' for OwnerId, 'textarea' for Description.
- Set 'value' to the extracted value from the question as a string (e.g., 'Test', 'test.com').
- Set 'operator' to '=' for all fields unless specified otherwise.
- Include all fields from the schema in 'resultColumns' with default labels (e.g., 'Account Name' for 'Name').
- Set 'sortColumn' to 'Name' with 'isAscSortOrder': false by default, unless sorting is specified (e.g., 'sorted by Site ascending' sets 'logicalName': 'Site', 'isAscSortOrder': true).
- Use ONLY valid JSON values: strings in quotes, numbers as numbers, booleans as true/false.
- Do NOT include any additional fields, duplicate sections, or invalid values (e.g., 'true' as a string or number).
- If the output is invalid JSON or contains 'true' as a value for fields like 'value' or 'operator', regenerate with correct data types.
- Return ONLY a single, valid JSON object starting with '{' and ending with '}'.
Do NOT include any additional text, explanations, or formatting.
"#;

/// Substituted for the retrieved-context section when the index has no
/// example documents yet.
pub const NO_EXAMPLES_NOTICE: &str = "No training examples available.";

/// Fixed few-shot examples appended to every prompt, covering a multi-field
/// equality filter, a filter with an ascending sort override, and a filter
/// containing a reference field with a resolved lookup id.
const FEWSHOT_BLOCK: &str = r#"Additional examples:
1. Question: 'Find accounts with name Test and site test.com'
   Output: {"version":{"majorRelease":1,"minorRelease":8,"patch":0},"sortColumn":{"logicalName":"Name","isAscSortOrder":false},"sectionsList":[{"objectName":"Account","label":"Account DETAILS","isListView":false,"fieldsList":[{"logicalName":"Name","operator":"=","value":"Test","type":"string","targetObject":"Account","showRadiusDistance":false,"isListView":false,"isLabelEdited":false},{"logicalName":"Site","operator":"=","value":"test.com","type":"string","targetObject":"Account","showRadiusDistance":false,"isListView":false,"isLabelEdited":false}]}],"resultColumns":[{"logicalName":"Name","type":"string","targetObject":"Account","label":"Account Name","isSortable":true,"isRadiusDistance":false,"attribute":"Name"},{"logicalName":"Site","type":"string","targetObject":"Account","label":"Account Site","isSortable":true,"isRadiusDistance":false,"attribute":"Site"},{"logicalName":"Phone","type":"phone","targetObject":"Account","label":"Account Phone","isSortable":true,"isRadiusDistance":false,"attribute":"Phone"},{"logicalName":"OwnerId","type":"reference","targetObject":"Account","label":"Owner","isSortable":true,"isRadiusDistance":false,"attribute":"OwnerId"},{"logicalName":"Description","type":"textarea","targetObject":"Account","label":"Account Description","isSortable":false,"isRadiusDistance":false,"attribute":"Description"}],"matchAnySection":false,"mapData":{"zoom":3.0,"data":{},"center":{"lat":42.87596410238256,"lng":-59.76562500000001}}}
2. Question: 'Find accounts with phone 4444 sorted by Site ascending'
   Output: {"version":{"majorRelease":1,"minorRelease":8,"patch":0},"sortColumn":{"logicalName":"Site","isAscSortOrder":true},"sectionsList":[{"objectName":"Account","label":"Account DETAILS","isListView":false,"fieldsList":[{"logicalName":"Phone","operator":"=","value":"4444","type":"phone","targetObject":"Account","showRadiusDistance":false,"isListView":false,"isLabelEdited":false}]}],"resultColumns":[{"logicalName":"Name","type":"string","targetObject":"Account","label":"Account Name","isSortable":true,"isRadiusDistance":false,"attribute":"Name"},{"logicalName":"Site","type":"string","targetObject":"Account","label":"Account Site","isSortable":true,"isRadiusDistance":false,"attribute":"Site"},{"logicalName":"Phone","type":"phone","targetObject":"Account","label":"Account Phone","isSortable":true,"isRadiusDistance":false,"attribute":"Phone"},{"logicalName":"OwnerId","type":"reference","targetObject":"Account","label":"Owner","isSortable":true,"isRadiusDistance":false,"attribute":"OwnerId"},{"logicalName":"Description","type":"textarea","targetObject":"Account","label":"Account Description","isSortable":false,"isRadiusDistance":false,"attribute":"Description"}],"matchAnySection":false,"mapData":{"zoom":3.0,"data":{},"center":{"lat":42.87596410238256,"lng":-59.76562500000001}}}
3. Question: 'Find accounts with name Test, site test.com, phone 4444, and owned by Natalia Natalia'
   Output: {"version":{"majorRelease":1,"minorRelease":8,"patch":0},"sortColumn":{"logicalName":"Name","isAscSortOrder":false},"sectionsList":[{"objectName":"Account","label":"Account DETAILS","isListView":false,"fieldsList":[{"logicalName":"Name","operator":"=","value":"Test","type":"string","targetObject":"Account","showRadiusDistance":false,"isListView":false,"isLabelEdited":false},{"logicalName":"Site","operator":"=","value":"test.com","type":"string","targetObject":"Account","showRadiusDistance":false,"isListView":false,"isLabelEdited":false},{"logicalName":"Phone","operator":"=","value":"4444","type":"phone","targetObject":"Account","showRadiusDistance":false,"isListView":false,"isLabelEdited":false},{"logicalName":"OwnerId","operator":"=","value":"0055e000001TEdhAAG","type":"reference","targetObject":"Account","showRadiusDistance":false,"isListView":false,"isLabelEdited":false,"lookupObject":"User","isPolymorphicField":false}]}],"resultColumns":[{"logicalName":"Name","type":"string","targetObject":"Account","label":"Account Name","isSortable":true,"isRadiusDistance":false,"attribute":"Name"},{"logicalName":"Site","type":"string","targetObject":"Account","label":"Account Site","isSortable":true,"isRadiusDistance":false,"attribute":"Site"},{"logicalName":"Phone","type":"phone","targetObject":"Account","label":"Account Phone","isSortable":true,"isRadiusDistance":false,"attribute":"Phone"},{"logicalName":"OwnerId","type":"reference","targetObject":"Account","label":"Owner","isSortable":true,"isRadiusDistance":false,"attribute":"OwnerId"},{"logicalName":"Description","type":"textarea","targetObject":"Account","label":"Account Description","isSortable":false,"isRadiusDistance":false,"attribute":"Description"}],"matchAnySection":false,"mapData":{"zoom":3.0,"data":{},"center":{"lat":42.87596410238256,"lng":-59.76562500000001}}}
"#;

/// Build the full prompt from the active schema, the retrieved example
/// context (in index order), and the target question.
pub fn compose(schema: &Value, retrieved: &[RetrievedExample], question: &str) -> String {
    let schema_json = serde_json::to_string(schema).unwrap_or_else(|_| "{}".to_string());

    let mut prompt = String::new();
    prompt.push_str(INSTRUCTION_PREAMBLE);
    write!(
        prompt,
        "Given the following schema: {}. You cannot change the schema; its structure must stay the same. ",
        schema_json
    )
    .unwrap();
    prompt.push_str(STRUCTURE_BLOCK);
    prompt.push_str(RULES_BLOCK);
    prompt.push('\n');

    prompt.push_str("Examples from training data:\n");
    if retrieved.is_empty() {
        prompt.push_str(NO_EXAMPLES_NOTICE);
        prompt.push('\n');
    } else {
        for (i, example) in retrieved.iter().enumerate() {
            writeln!(prompt, "{}. Question: '{}'", i + 1, example.question).unwrap();
            writeln!(prompt, "   Output: {}", example.query_json).unwrap();
        }
    }

    prompt.push_str(FEWSHOT_BLOCK);
    write!(prompt, "Now, generate a JSON query for: '{}'", question).unwrap();
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn retrieved(question: &str, query: Value) -> RetrievedExample {
        RetrievedExample {
            question: question.to_string(),
            query_json: query.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn test_compose_is_deterministic() {
        let schema = json!({"objectName": "Account", "fields": ["Name", "Site"]});
        let context = vec![retrieved("Find accounts with name Test", json!({"a": 1}))];

        let first = compose(&schema, &context, "Find accounts with phone 4444");
        let second = compose(&schema, &context, "Find accounts with phone 4444");
        assert_eq!(first, second);
    }

    #[test]
    fn test_question_change_only_affects_trailing_restatement() {
        let schema = json!({"objectName": "Account"});
        let context = vec![retrieved("q", json!({"a": 1}))];

        let first = compose(&schema, &context, "Find accounts with name Test");
        let second = compose(&schema, &context, "Find accounts owned by Natalia");

        let marker = "Now, generate a JSON query for:";
        let first_prefix = first.split(marker).next().unwrap();
        let second_prefix = second.split(marker).next().unwrap();
        assert_eq!(first_prefix, second_prefix);
        assert!(first.ends_with("'Find accounts with name Test'"));
        assert!(second.ends_with("'Find accounts owned by Natalia'"));
    }

    #[test]
    fn test_empty_context_uses_fixed_notice() {
        let prompt = compose(&json!({}), &[], "anything");
        assert!(prompt.contains(NO_EXAMPLES_NOTICE));
    }

    #[test]
    fn test_retrieved_examples_are_numbered_in_order() {
        let context = vec![
            retrieved("first question", json!({"n": 1})),
            retrieved("second question", json!({"n": 2}))
        ];
        let prompt = compose(&json!({}), &context, "anything");

        assert!(prompt.contains("1. Question: 'first question'"));
        assert!(prompt.contains("   Output: {\"n\":1}"));
        assert!(prompt.contains("2. Question: 'second question'"));
        assert!(!prompt.contains(NO_EXAMPLES_NOTICE));

        let first_at = prompt.find("first question").unwrap();
        let second_at = prompt.find("second question").unwrap();
        assert!(first_at < second_at);
    }

    #[test]
    fn test_schema_is_interpolated_verbatim() {
        let schema = json!({"fields": ["Name", "Phone"], "objectName": "Account"});
        let prompt = compose(&schema, &[], "anything");
        assert!(prompt.contains(&serde_json::to_string(&schema).unwrap()));
    }

    #[test]
    fn test_fixed_sections_are_present() {
        let prompt = compose(&json!({}), &[], "anything");
        assert!(prompt.contains("\"version\""));
        assert!(prompt.contains("\"sortColumn\""));
        assert!(prompt.contains("\"sectionsList\""));
        assert!(prompt.contains("\"resultColumns\""));
        assert!(prompt.contains("\"matchAnySection\""));
        assert!(prompt.contains("\"mapData\""));
        assert!(prompt.contains("Additional examples:"));
        assert!(prompt.contains("sorted by Site ascending"));
        assert!(prompt.contains("0055e000001TEdhAAG"));
    }
}
