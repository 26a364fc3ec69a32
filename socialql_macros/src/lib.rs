use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, ItemFn};

/// Wraps an async test body that takes a [`Client`] into a tokio test. The generated test
/// initializes logging and hands the body a client bound to a freshly seeded local engine, so
/// every test starts from the same users and posts.
///
/// [`Client`]: ../socialql/client/enum.Client.html
#[proc_macro_attribute]
pub fn sq_test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input: ItemFn = parse_macro_input!(item);

    let name = &input.sig.ident;
    let name_local = format_ident!("{}{}", name, "_local");

    let gen = quote! {
        #[tokio::test]
        async fn #name_local() {
            setup::init();

            let client = setup::test_client("./tests/fixtures/config.yml");
            #name(client).await;
        }

        #input
    };

    gen.into()
}
