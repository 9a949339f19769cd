use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::countries;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = countries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Country {
    pub id: i32,
    pub name: String,
    pub iso_code: String,
}
