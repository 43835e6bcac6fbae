

#[ctor::ctor]
fn _setup() {
    estore_common::logger();
}
