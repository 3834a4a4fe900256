use std::env;
use std::io::Write;

use log::SetLoggerError;
use time::macros::format_description;
use time::OffsetDateTime;

fn timestamp(now: OffsetDateTime) -> String {
    let time = now.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_default();
    format!("{},{:03}", time, now.millisecond())
}

pub fn init() -> Result<(), SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder.format(|buf, record| {
        writeln!(buf, "[{}] {}: {}", timestamp(OffsetDateTime::now_utc()), record.level(), record.args())
    });
    let config = env::var("RUST_LOG").unwrap_or_else(|_| "warn,clipwatch=info,selection_watch=info".to_string());
    builder.parse_filters(&config);
    builder.try_init()
}
