use std::sync::Arc;

use crate::api::ApiError;

/// What a consumer currently knows about a resource.
#[derive(Debug, Clone)]
pub enum FetchState<T> {
    /// Nothing requested yet
    Idle,
    /// A fetch is running and there is nothing cached to show meanwhile
    Loading,
    Ready(T),
    /// The fetch failed and no cached value was available
    Error(Arc<ApiError>),
}

impl<T> FetchState<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FetchState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<ApiError>> {
        match self {
            FetchState::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    /// `Ready` and `Error` are the states a consumer can be left in.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchState::Ready(_) | FetchState::Error(_))
    }

    /// Reshape a ready value for display. `f` must be pure.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchState<U> {
        match self {
            FetchState::Idle => FetchState::Idle,
            FetchState::Loading => FetchState::Loading,
            FetchState::Ready(value) => FetchState::Ready(f(value)),
            FetchState::Error(e) => FetchState::Error(e),
        }
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        FetchState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let ready: FetchState<Vec<i32>> = FetchState::Ready(vec![1]);
        assert_eq!(ready.value(), Some(&vec![1]));
        assert!(ready.is_terminal());
        assert!(!ready.is_loading());

        let loading: FetchState<Vec<i32>> = FetchState::Loading;
        assert!(loading.is_loading());
        assert!(!loading.is_terminal());
        assert!(loading.value().is_none());

        let failed: FetchState<Vec<i32>> = FetchState::Error(Arc::new(ApiError::RateLimited));
        assert!(failed.is_terminal());
        assert!(matches!(failed.error().map(|e| e.as_ref()), Some(ApiError::RateLimited)));

        assert!(matches!(FetchState::<()>::default(), FetchState::Idle));
    }

    #[test]
    fn test_map_only_touches_ready() {
        let ready = FetchState::Ready(vec!["a", "b"]).map(|v| v.len());
        assert_eq!(ready.value(), Some(&2));

        let failed: FetchState<Vec<&str>> = FetchState::Error(Arc::new(ApiError::Unauthorized));
        let mapped = failed.map(|v| v.len());
        assert!(mapped.error().is_some());

        assert!(FetchState::<Vec<&str>>::Loading.map(|v| v.len()).is_loading());
    }
}
