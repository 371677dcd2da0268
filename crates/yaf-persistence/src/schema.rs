//! Esquema Diesel (escrito a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    yaf_registry (registry_id) {
        registry_id -> Int4,
        name -> Text,
        value -> Nullable<Text>,
        board_id -> Nullable<Int4>,
    }
}
