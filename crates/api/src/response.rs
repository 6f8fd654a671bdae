//! Response envelope shared by every API handler.

use serde::Serialize;

/// `{ "data": T }` wrapper applied to all successful responses, keeping
/// the payload shape uniform for the frontend client.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
