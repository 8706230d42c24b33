//! Darwin Core key resolution, normalization, and validation-flag
//! generation (§4.7).

mod mapper;
mod normalize;
mod resolve;
mod validate;

pub use mapper::Mapper;
pub use normalize::{
    normalize_basis_of_record, normalize_field, normalize_institution_code, normalize_type_status,
};
pub use resolve::{builtin_mapping_table, strip_prefix, MappingTable};
pub use validate::{apply_validation_flags, ValidationContext};
