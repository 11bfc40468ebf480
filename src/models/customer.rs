use serde::{Deserialize, Serialize};

use crate::store::fields;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendCustomer {
    #[serde(rename = "Id_customer", default, deserialize_with = "fields::string")]
    pub id: String,
    #[serde(rename = "CustomerCode", default, deserialize_with = "fields::string")]
    pub code: String,
}

impl BackendCustomer {
    pub fn to_domain(&self) -> Customer {
        Customer {
            id: self.id.clone(),
            code: self.code.clone(),
        }
    }
}
