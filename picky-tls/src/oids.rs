//! Object identifiers found in the algorithm identifier of a SubjectPublicKeyInfo

use const_oid::ObjectIdentifier;

macro_rules! define_oid {
    ($uppercase:ident => $str_value:literal) => {
        pub const $uppercase: ObjectIdentifier = ObjectIdentifier::new_unwrap($str_value);
    };
    ( $( $uppercase:ident => $str_value:literal, )+ ) => {
        $( define_oid! { $uppercase => $str_value } )+
    };
}

define_oid! {
    // ANSI-X962
    EC_PUBLIC_KEY => "1.2.840.10045.2.1",

    // ANSI-X942
    DH_PUBLIC_NUMBER => "1.2.840.10046.2.1",

    // ANSI-X957
    DSA => "1.2.840.10040.4.1",

    // RSADSI
    RSA_ENCRYPTION => "1.2.840.113549.1.1.1",
    ID_MGF1 => "1.2.840.113549.1.1.8",
    RSASSA_PSS => "1.2.840.113549.1.1.10",
    DH_KEY_AGREEMENT => "1.2.840.113549.1.3.1",

    // X.500 algorithms
    ID_EA_RSA => "2.5.8.1.1",

    // Certicom Object Identifiers
    SECP256R1 => "1.2.840.10045.3.1.7",
    SECP384R1 => "1.3.132.0.34",
    SECP521R1 => "1.3.132.0.35",

    // RFC 8410
    X25519 => "1.3.101.110",
    X448 => "1.3.101.111",
    ED25519 => "1.3.101.112",
    ED448 => "1.3.101.113",

    // hash algorithms
    SHA1 => "1.3.14.3.2.26",
    SHA224 => "2.16.840.1.101.3.4.2.4",
    SHA256 => "2.16.840.1.101.3.4.2.1",
    SHA384 => "2.16.840.1.101.3.4.2.2",
    SHA512 => "2.16.840.1.101.3.4.2.3",
}
