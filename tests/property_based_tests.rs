//! Property tests for keyring invariants.

mod util;

use std::collections::HashSet;

use proptest::prelude::*;
use utxo_keyring::keyring::HdKeyringState;
use utxo_keyring::{HdKeyring, Keyring, SighashType};
use util::*;

fn restored() -> HdKeyring {
    let state = HdKeyringState {
        mnemonic: Some(MNEMONIC.to_string()),
        ..HdKeyringState::default()
    };
    HdKeyring::from_state(config(), os_entropy(), &state).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Activate(Vec<u32>),
    RemoveFirst,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..4).prop_map(Op::Add),
        proptest::collection::vec(0u32..12, 1..4).prop_map(Op::Activate),
        Just(Op::RemoveFirst),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn accounts_never_duplicate(ops in proptest::collection::vec(op(), 1..8)) {
        let mut kr = restored();
        for op in ops {
            match op {
                Op::Add(n) => { kr.add_accounts(n).unwrap(); }
                Op::Activate(indexes) => { kr.active_accounts(&indexes).unwrap(); }
                Op::RemoveFirst => {
                    if let Some(first) = kr.get_accounts().first().cloned() {
                        kr.remove_account(&first).unwrap();
                    }
                }
            }
            let accounts = kr.get_accounts();
            let unique: HashSet<_> = accounts.iter().collect();
            prop_assert_eq!(unique.len(), accounts.len());

            let indexes: HashSet<_> = kr.active_indexes().iter().collect();
            prop_assert_eq!(indexes.len(), kr.active_indexes().len());
            prop_assert_eq!(indexes.len(), accounts.len());
        }
    }

    #[test]
    fn page_never_below_one(moves in proptest::collection::vec(any::<bool>(), 1..12)) {
        let mut kr = restored();
        kr.get_first_page().unwrap();
        let mut expected: u32 = 1;
        for forward in moves {
            if forward {
                kr.get_next_page().unwrap();
                expected += 1;
            } else {
                kr.get_previous_page().unwrap();
                expected = expected.saturating_sub(1).max(1);
            }
            prop_assert_eq!(kr.page(), expected);
        }
    }

    #[test]
    fn replay_protection_keeps_low_byte(t in any::<u32>()) {
        let protected = SighashType::from_u32(t).with_replay_protection().to_u32();
        prop_assert_eq!(protected & 0xff, t & 0xff);
        prop_assert_eq!(protected >> 24, 0xff);
        prop_assert_ne!(protected, t);
    }
}
