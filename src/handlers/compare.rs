use super::parse_json;
use crate::responses::{json_response, ResultResp};
use crate::services::CompareRequest;
use crate::state::AppState;

pub fn compare_properties(state: &AppState, body: &[u8]) -> ResultResp {
    let req: CompareRequest = parse_json(body)?;
    let result = state.comparator.compare(&req)?;
    json_response(200, &result)
}
