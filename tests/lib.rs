// Shared fixtures for cross-crate behavior tests.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use tradepulse_core::source::{
    RawTradeRow, SourceError, StatisticsRequest, TradeDataSource,
};

/// Source that serves one scripted result per call, then empty pages
/// (or endless outages when built with [`ScriptedSource::always_failing`]).
pub struct ScriptedSource {
    script: Mutex<Vec<Result<Vec<RawTradeRow>, SourceError>>>,
    fail_when_exhausted: bool,
}

impl ScriptedSource {
    pub fn new(mut script: Vec<Result<Vec<RawTradeRow>, SourceError>>) -> Self {
        script.reverse();
        Self {
            script: Mutex::new(script),
            fail_when_exhausted: false,
        }
    }

    pub fn serving(rows: Vec<RawTradeRow>) -> Self {
        Self::new(vec![Ok(rows)])
    }

    pub fn always_failing() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            fail_when_exhausted: true,
        }
    }
}

impl TradeDataSource for ScriptedSource {
    fn fetch_statistics<'a>(
        &'a self,
        _request: &'a StatisticsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawTradeRow>, SourceError>> + Send + 'a>> {
        let scripted = self
            .script
            .lock()
            .expect("script lock is not poisoned")
            .pop();
        let result = scripted.unwrap_or_else(|| {
            if self.fail_when_exhausted {
                Err(SourceError::unavailable("scripted outage"))
            } else {
                Ok(Vec::new())
            }
        });
        Box::pin(async move { result })
    }
}

/// One wire-shaped row as the customs endpoint would serve it.
pub fn wire_row(year: &str, hs_code: &str, exp_dlr: &str) -> RawTradeRow {
    RawTradeRow {
        year: year.to_owned(),
        hs_code: hs_code.to_owned(),
        stat_kor: format!("product {hs_code}"),
        exp_dlr: exp_dlr.to_owned(),
        exp_wgt: String::from("1,000"),
        imp_dlr: String::new(),
        imp_wgt: String::new(),
        bal_payments: String::new(),
    }
}

/// Writes a reference CSV with the given `(code, name)` rows and returns
/// its path.
pub fn write_reference_csv(dir: &Path, codes: &[(&str, &str)]) -> PathBuf {
    let mut content = String::from("code,name,description\n");
    for (code, name) in codes {
        content.push_str(&format!("{code},{name},\n"));
    }
    let path = dir.join("reference_codes.csv");
    std::fs::write(&path, content).expect("write reference csv");
    path
}
