use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=build.rs");

    // Firmware build timestamp, used to seed the RTC after it loses backup
    // power. SOURCE_DATE_EPOCH wins so reproducible builds stay stable.
    let epoch = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
        });
    println!("cargo:rustc-env=FPACCESS_BUILD_EPOCH={epoch}");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
