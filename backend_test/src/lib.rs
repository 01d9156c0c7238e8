use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one running on its own
/// runtime, and inject dependencies.
///
/// Injectable dependencies are `crate::test_support::TestEnv` (an in-memory
/// store, fake clock, services and config) and
/// [`rocket::local::asynchronous::Client`] (a local client over that same
/// environment). Each may be requested at most once, in any order.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    if !args.is_empty() {
        let args = TokenStream2::from(args);
        return syn::Error::new(args.span(), "`backend_test` takes no arguments")
            .into_compile_error()
            .into();
    }

    // Extract the arguments to inject and reject invalid function signatures.
    let (test_args, wants_client) = match check_sig(&item_fn.sig) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let client_setup = if wants_client {
        quote! { let rocket_client = env.client().await; }
    } else {
        quote! {}
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let env = crate::test_support::TestEnv::new();
                #client_setup
                #new_name(#(#test_args),*).await
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, and map each parameter to the value
/// injected for it. Also reports whether a client is needed.
fn check_sig(sig: &Signature) -> Result<(Vec<TokenStream2>, bool), syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_env = false;
    let mut has_client = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(last) = type_path.path.segments.last() {
                    if last.ident == "TestEnv" {
                        if has_env {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `TestEnv`",
                            ));
                        }
                        has_env = true;
                        args.push(quote! { env });
                        continue;
                    } else if last.ident == "Client" {
                        if has_client {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                            ));
                        }
                        has_client = true;
                        args.push(quote! { rocket_client });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `env_ident: TestEnv` or `client_ident: Client`",
        ));
    }

    Ok((args, has_client))
}
