use std::env::{self, VarError};
use std::panic::{self, RefUnwindSafe, UnwindSafe};
use std::sync::{Mutex, PoisonError};

use lazy_static::lazy_static;

lazy_static! {
    static ref SERIAL_TEST: Mutex<()> = Default::default();
}

/// Sets environment variables for the duration of `closure`, serialized
/// against every other caller. `None` removes the variable. The previous
/// values are restored even if `closure` panics.
pub fn with_env_vars<F>(kvs: Vec<(&str, Option<&str>)>, closure: F)
where
    F: Fn() + UnwindSafe + RefUnwindSafe,
{
    let guard = SERIAL_TEST.lock().unwrap_or_else(PoisonError::into_inner);
    let mut old_kvs: Vec<(&str, Result<String, VarError>)> = Vec::new();
    for (k, v) in kvs {
        let old_v = env::var(k);
        old_kvs.push((k, old_v));
        match v {
            None => env::remove_var(k),
            Some(v) => env::set_var(k, v),
        }
    }

    let result = panic::catch_unwind(|| closure());
    for (k, v) in old_kvs {
        reset_env(k, v);
    }
    drop(guard);

    if let Err(err) = result {
        panic::resume_unwind(err);
    }
}

fn reset_env(k: &str, old: Result<String, VarError>) {
    if let Ok(v) = old {
        env::set_var(k, v);
    } else {
        env::remove_var(k);
    }
}
