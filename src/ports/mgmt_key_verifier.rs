use crate::error::YkpivResult;
use crate::model::ManagementKey;

pub trait ManagementKeyVerifier {
    fn authenticate(&mut self, mgmt_key: &ManagementKey) -> YkpivResult<()>;
}
