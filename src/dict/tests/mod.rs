mod lookup;

use super::*;

fn sample_dict() -> Dictionary {
    Dictionary::from_entries(
        ValueKind::String,
        vec![("cat", 5.0, "v1"), ("car", 3.0, "v2"), ("cart", 4.0, "v3")],
    )
    .unwrap()
}
