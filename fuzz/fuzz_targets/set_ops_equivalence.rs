#![no_main]

use avl_pairs::model::SetOpsInput;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: SetOpsInput| {
    avl_pairs::model::run_set_ops_equivalence(input.left, input.right);
});
