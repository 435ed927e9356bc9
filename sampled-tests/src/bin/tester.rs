extern crate sampled_tests;

fn main() {
    sampled_tests::execute_tester();
}
