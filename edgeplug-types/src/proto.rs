//! Protobuf bindings for the Sparkplug B `Payload` message.
//!
//! Maintained by hand in `prost-build` output form so that building the
//! workspace does not require a `protoc` toolchain. Field numbers follow the
//! Eclipse Tahu `sparkplug_b.proto` definition; bytes produced here are
//! decodable by the Tahu reference decoder.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payload {
    /// Timestamp at message sending time, in milliseconds since the Unix epoch, UTC.
    #[prost(uint64, optional, tag = "1")]
    pub timestamp: ::core::option::Option<u64>,
    #[prost(message, repeated, tag = "2")]
    pub metrics: ::prost::alloc::vec::Vec<payload::Metric>,
    /// Sequence number, 0-255. Absent on NDEATH and STATE.
    #[prost(uint64, optional, tag = "3")]
    pub seq: ::core::option::Option<u64>,
    #[prost(string, optional, tag = "4")]
    pub uuid: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub body: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}
/// Nested message and enum types in `Payload`.
pub mod payload {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Metric {
        #[prost(string, optional, tag = "1")]
        pub name: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(uint64, optional, tag = "2")]
        pub alias: ::core::option::Option<u64>,
        #[prost(uint64, optional, tag = "3")]
        pub timestamp: ::core::option::Option<u64>,
        /// A [DataType] tag value.
        #[prost(uint32, optional, tag = "4")]
        pub datatype: ::core::option::Option<u32>,
        #[prost(bool, optional, tag = "5")]
        pub is_historical: ::core::option::Option<bool>,
        #[prost(bool, optional, tag = "6")]
        pub is_transient: ::core::option::Option<bool>,
        #[prost(bool, optional, tag = "7")]
        pub is_null: ::core::option::Option<bool>,
        #[prost(message, optional, tag = "8")]
        pub metadata: ::core::option::Option<MetaData>,
        #[prost(oneof = "metric::Value", tags = "10, 11, 12, 13, 14, 15, 16")]
        pub value: ::core::option::Option<metric::Value>,
    }
    /// Nested message and enum types in `Metric`.
    pub mod metric {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Value {
            #[prost(uint32, tag = "10")]
            IntValue(u32),
            #[prost(uint64, tag = "11")]
            LongValue(u64),
            #[prost(float, tag = "12")]
            FloatValue(f32),
            #[prost(double, tag = "13")]
            DoubleValue(f64),
            #[prost(bool, tag = "14")]
            BooleanValue(bool),
            #[prost(string, tag = "15")]
            StringValue(::prost::alloc::string::String),
            #[prost(bytes, tag = "16")]
            BytesValue(::prost::alloc::vec::Vec<u8>),
        }
    }
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct MetaData {
        #[prost(bool, optional, tag = "1")]
        pub is_multi_part: ::core::option::Option<bool>,
        #[prost(string, optional, tag = "2")]
        pub content_type: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(uint64, optional, tag = "3")]
        pub size: ::core::option::Option<u64>,
        #[prost(uint64, optional, tag = "4")]
        pub seq: ::core::option::Option<u64>,
        #[prost(string, optional, tag = "5")]
        pub file_name: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "6")]
        pub file_type: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "7")]
        pub md5: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "8")]
        pub description: ::core::option::Option<::prost::alloc::string::String>,
    }
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum DataType {
        Unknown = 0,
        Int8 = 1,
        Int16 = 2,
        Int32 = 3,
        Int64 = 4,
        UInt8 = 5,
        UInt16 = 6,
        UInt32 = 7,
        UInt64 = 8,
        Float = 9,
        Double = 10,
        Boolean = 11,
        String = 12,
        DateTime = 13,
        Text = 14,
        Uuid = 15,
        DataSet = 16,
        Bytes = 17,
        File = 18,
        Template = 19,
        PropertySet = 20,
        PropertySetList = 21,
        Int8Array = 22,
        Int16Array = 23,
        Int32Array = 24,
        Int64Array = 25,
        UInt8Array = 26,
        UInt16Array = 27,
        UInt32Array = 28,
        UInt64Array = 29,
        FloatArray = 30,
        DoubleArray = 31,
        BooleanArray = 32,
        StringArray = 33,
        DateTimeArray = 34,
    }
}
