use std::sync::atomic::AtomicU64;

pub static CALL_ID: AtomicU64 = AtomicU64::new(0);

pub type CallID = u64;

#[macro_export]
macro_rules! log_call {
    ($call:literal, $($arg:expr),* $(,)?) => {{
        let id = $crate::logging::CALL_ID.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        println!("{}({}): {}",$call,format!($($arg,)*),id);
        id
    }};
}

#[macro_export]
macro_rules! log_more {
    ($callid: ident, $($arg:expr),* $(,)?) => {{
        println!(" {} : {}",$callid,format!($($arg,)*));
    }};
}

#[macro_export]
macro_rules! log_res {
    ($callid: ident, $($arg:expr),* $(,)?) => {{
        println!(" {} => {}",$callid,format!($($arg,)*));
    }};
}
