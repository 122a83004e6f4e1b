/// Lets any struct that is Serialize + Deserialize be used as Redis args and values.
/// Values are stored bincode-encoded.
#[macro_export]
macro_rules! impl_redis_rv {
    ($( $t:ty ),+) => {
        $(
            impl ::redis::ToRedisArgs for $t {
                fn write_redis_args<W>(&self, out: &mut W)
                where
                    W: ?Sized + ::redis::RedisWrite,
                {
                    out.write_arg(&::bincode::serialize(self).expect("Failed to bincode-serialize"));
                }
            }
            impl ::redis::FromRedisValue for $t {
                fn from_redis_value(v: &::redis::Value) -> ::redis::RedisResult<Self> {
                    if let ::redis::Value::Data(data) = v {
                        ::bincode::deserialize(data).map_err(|_| {
                            ::redis::RedisError::from((
                                ::redis::ErrorKind::IoError,
                                "Response data not convertible",
                            ))
                        })
                    } else {
                        Err(::redis::RedisError::from((
                            ::redis::ErrorKind::TypeError,
                            "Response type not convertible",
                        )))
                    }
                }
            }
        )+
    };
}
