//! Lua scripts evaluated server-side for multi-key atomicity.

/// Atomic session admission.
///
/// KEYS[1] = registry hash
/// KEYS[2] = limit key
/// KEYS[3] = TTL marker key
/// ARGV[1] = token
/// ARGV[2] = default limit
/// ARGV[3] = marker TTL in milliseconds
///
/// Returns `{code, size, limit}` where code is:
///   1 = admitted
///   0 = denied (registry full)
///  -1 = already registered, marker refreshed
pub(crate) const ADMIT_SCRIPT: &str = r#"
    local registry_key = KEYS[1]
    local limit_key = KEYS[2]
    local marker_key = KEYS[3]
    local token = ARGV[1]
    local limit = tonumber(ARGV[2])
    local ttl_ms = tonumber(ARGV[3])

    local raw = redis.call('GET', limit_key)
    if raw then
        limit = tonumber(raw)
        if not limit or limit <= 0 or limit ~= math.floor(limit) then
            return redis.error_reply('invalid session limit: ' .. raw)
        end
    end

    if redis.call('HEXISTS', registry_key, token) == 1 then
        redis.call('SET', marker_key, '', 'PX', ttl_ms)
        return {-1, redis.call('HLEN', registry_key), limit}
    end

    local size = redis.call('HLEN', registry_key)
    if size >= limit then
        return {0, size, limit}
    end

    redis.call('HSET', registry_key, token, '')
    redis.call('SET', marker_key, '', 'PX', ttl_ms)
    return {1, size + 1, limit}
"#;

/// Conditional removal of a lapsed registry field.
///
/// KEYS[1] = registry hash
/// KEYS[2] = TTL marker key
/// ARGV[1] = token
///
/// Returns 1 if the field was removed, 0 if the marker is alive or the
/// field was already gone.
pub(crate) const REAP_SCRIPT: &str = r#"
    if redis.call('EXISTS', KEYS[2]) == 1 then
        return 0
    end
    return redis.call('HDEL', KEYS[1], ARGV[1])
"#;
