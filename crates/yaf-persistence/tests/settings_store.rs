//! Registro global + override por board persistido en Postgres.


use yaf_core::RegistryLevel;
use yaf_persistence::BoardSettingsStore;

use test_support::{unique_key, with_functions};

#[test]
fn board_override_shadows_global_value() {
    with_functions(|f| {
        let store = BoardSettingsStore::new(f);
        let key = unique_key("PostsPerPage");
        let board = 41;

        store.save(&key, Some("20"), None).expect("global");
        let mut registry = store.load(board).expect("load");
        assert_eq!(registry.get_value(&key, 0), 20);

        registry.default_set_override = true;
        assert_eq!(store.set_value(&mut registry, board, &key, 50).expect("set"), RegistryLevel::Board);

        let reloaded = store.load(board).expect("reload");
        assert_eq!(reloaded.get_value(&key, 0), 50);
        assert_eq!(reloaded.base.get_value(&key, 0), 20);
    });
}
