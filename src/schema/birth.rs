//! Birth registration record schema.
//!
//! Column list and order mirror the upstream `birth_registration` view.
//! The order is load-bearing for CSV output, so keep it stable.

use super::RecordSchema;

/// Pagination key for birth registrations.
pub const BIRTH_KEY_COLUMN: &str = "Birth_Reg_ID";

/// Default destination table name for extracted birth registrations.
pub const BIRTH_TABLE_NAME: &str = "birth_records";

/// Full ordered column list of the birth registration view.
pub const BIRTH_COLUMNS: [&str; 102] = [
    "Birth_Reg_ID",
    "Certificate_No",
    "birth_place_desc",
    "birth_type_desc",
    "birth_order_number",
    "birth_order_desc",
    "locality_desc",
    "Date_Registerred",
    "mother_age_at_birth",
    "father_age_at_birth",
    "mother_marital_status_desc",
    "father_marital_status_desc",
    "child_id",
    "child_surname",
    "child_firstname",
    "child_middle_name",
    "child_birth_date",
    "child_nin",
    "child_nin_status",
    "child_sex",
    "child_birth_country",
    "child_birth_state",
    "child_birth_lga",
    "child_town_of_birth",
    "child_town_of_origin",
    "child_ethnic_group",
    "mother_id",
    "mother_surname",
    "mother_firstname",
    "mother_middle_name",
    "mother_maiden_name",
    "mother_birth_date",
    "mother_nin",
    "mother_no_nin_reason",
    "mother_ethnic_group",
    "mother_nationality",
    "mother_residence_country",
    "mother_residence_state",
    "mother_residence_lga",
    "mother_occupation",
    "mother_phone",
    "mother_address",
    "father_id",
    "father_surname",
    "father_firstname",
    "father_middle_name",
    "father_birth_date",
    "father_nin",
    "father_no_nin_reason",
    "father_ethnic_group",
    "father_nationality",
    "father_residence_country",
    "father_residence_state",
    "father_residence_lga",
    "father_occupation",
    "father_phone",
    "father_address",
    "informant_id",
    "informant_surname",
    "informant_firstname",
    "informant_middle_name",
    "informant_nin",
    "informant_phone",
    "informant_address",
    "informant_relationship",
    "registration_center",
    "registration_center_state",
    "registration_center_lga",
    "registration_center_lga_code",
    "registration_center_geo_zone",
    "registered_by_user",
    "registered_by_email",
    "registered_by_phone",
    "registered_by_nin",
    "registered_by_role",
    "modified_by_user",
    "modified_by_email",
    "modified_by_phone",
    "modified_by_nin",
    "modified_by_role",
    "Date_Modified",
    "approved_by_user",
    "approved_by_email",
    "approved_by_phone",
    "approved_by_nin",
    "approved_by_role",
    "Approval_Status",
    "Date_Approved",
    "printed_by_user",
    "printed_by_email",
    "printed_by_phone",
    "printed_by_nin",
    "printed_by_role",
    "Print_Status",
    "Date_Printed",
    "br_shared",
    "br_shared_by",
    "Modified_Status",
    "Modified_Print",
    "initiated_at",
    "approval_status_desc",
    "print_status_desc",
];

/// Schema for the birth registration view, keyed on [`BIRTH_KEY_COLUMN`].
#[must_use]
pub fn birth_record_schema() -> RecordSchema {
    RecordSchema::new(BIRTH_TABLE_NAME, BIRTH_KEY_COLUMN, BIRTH_COLUMNS)
}
