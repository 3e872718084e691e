use serde::{Deserialize, Serialize};

/// Log how long an expression took at `debug` level.
#[macro_export]
macro_rules! timed {
  ($name:expr, $($tail:tt)*) => {
    {
      let now = std::time::Instant::now();
      let value = $($tail)*;
      log::debug!("Done  `{}` ({} ms)", $name, now.elapsed().as_millis());
      value
    }
  };
}

/// superjson payload wrapper used by the tRPC transformer.
#[derive(Deserialize, Serialize, Debug, Clone, Hash, PartialEq, Eq)]
pub struct Json<T> {
    pub json: T,
}

impl<T> Json<T> {
    pub fn new(json: T) -> Self {
        Self { json }
    }
    pub fn raw(self) -> T {
        self.json
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ResultData<T> {
    pub data: Json<T>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Success<T> {
    pub result: ResultData<T>,
}

impl<T> Success<T> {
    pub fn raw(self) -> T {
        self.result.data.raw()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Failure<E> {
    pub error: Json<E>,
}

/// Ensure a cookie value carries its name, as pasted values often don't.
pub fn cookie(name: &str, value: &str) -> String {
    let prefix = format!("{}=", name);
    if value.starts_with(&prefix) {
        value.to_string()
    } else {
        format!("{}{}", prefix, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_prefix_added_once() {
        assert_eq!(cookie("__session", "abc"), "__session=abc");
        assert_eq!(cookie("__session", "__session=abc"), "__session=abc");
    }

    #[test]
    fn unwraps_success_envelope() {
        let body = r#"{"result":{"data":{"json":[1,2,3]}}}"#;
        let success: Success<Vec<u32>> = serde_json::from_str(body).unwrap();
        assert_eq!(success.raw(), vec![1, 2, 3]);
    }
}
