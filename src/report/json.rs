use crate::types::result::TestResult;

pub fn to_json(result: &TestResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}
