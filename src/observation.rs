use chrono::NaiveDate;

// HydroBASINS ids are 10 digits, too wide for u32
pub type WatershedId = u64;

// One row of the social-media fact table
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub watershed_id: WatershedId,
    pub date: NaiveDate,
    pub topic: Option<String>,
    // Raw label, still carrying its numeric prefix (e.g. "2_High")
    pub precipitation: String,
}
