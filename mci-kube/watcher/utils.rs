use kube::runtime::watcher::Error;

/// Checks if specified watcher error is an API error or any other error.\
/// `check_forbidden` - returns `true` only for forbidden (403) API error.
pub fn is_api_error(error: &Error, check_forbidden: bool) -> bool {
    match error {
        Error::InitialListFailed(kube::Error::Api(response))
        | Error::WatchStartFailed(kube::Error::Api(response))
        | Error::WatchError(response)
        | Error::WatchFailed(kube::Error::Api(response)) => !check_forbidden || response.is_forbidden(),
        _ => false,
    }
}
