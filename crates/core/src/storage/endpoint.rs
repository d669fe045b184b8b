use url::Url;

/// Rewrites a `127.0.0.1` endpoint host to `localhost`, keeping scheme, port
/// and path as written. Some S3 clients resolve the literal loopback address
/// unreliably; the hostname form does not have that problem.
///
/// Anything that does not parse, or whose host is not the IPv4 loopback
/// address, is returned unchanged.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let Ok(url) = Url::parse(endpoint) else {
        return endpoint.to_string();
    };
    // Compared as text: non-special schemes keep their host opaque.
    if url.host_str() != Some("127.0.0.1") {
        return endpoint.to_string();
    }

    // Splice the host text instead of re-serializing, which would append a
    // trailing slash to an empty path.
    let Some(scheme_end) = endpoint.find("://") else {
        return endpoint.to_string();
    };
    let start = scheme_end + 3;
    let authority_end = endpoint[start..]
        .find(['/', '?', '#'])
        .map_or(endpoint.len(), |i| start + i);
    let host_start = endpoint[start..authority_end]
        .rfind('@')
        .map_or(start, |i| start + i + 1);
    let host_end = endpoint[host_start..authority_end]
        .find(':')
        .map_or(authority_end, |i| host_start + i);

    format!(
        "{}localhost{}",
        &endpoint[..host_start],
        &endpoint[host_end..]
    )
}
