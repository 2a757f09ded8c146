fn main() {
    println!("cargo:rerun-if-changed=config/coopdoor.json");

    // ESP-IDF link arguments are only needed for the firmware build; host
    // builds (tests) run without the IDF toolchain.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
