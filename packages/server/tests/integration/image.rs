use serde_json::json;

use crate::common::{TestApp, routes};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png but close enough";

mod upload {
    use super::*;

    #[tokio::test]
    async fn uploaded_image_resolves_to_identical_bytes() {
        let app = TestApp::spawn().await;
        let grenade_id = app.create_grenade("dust2", "smoke", "CT").await;

        let image = app.upload_image(grenade_id, "xbox.PNG", PNG_BYTES).await;

        let name = image["name"].as_str().unwrap();
        assert!(name.ends_with(".png"), "{name}");
        assert!(image["id"].as_i64().unwrap() > 0);
        let url = image["image_url"].as_str().unwrap();
        assert_eq!(url, app.url(&format!("/v1/image/{name}")));

        let (status, bytes) = app.fetch_bytes(url).await;
        assert_eq!(status, 200);
        assert_eq!(bytes, PNG_BYTES);
        assert_eq!(app.stored_objects(), vec![name.to_string()]);
    }

    #[tokio::test]
    async fn gif_is_rejected_without_storage_write() {
        let app = TestApp::spawn().await;
        let grenade_id = app.create_grenade("dust2", "smoke", "CT").await;

        let res = app
            .upload(&routes::grenade_images(grenade_id), "spin.gif", b"GIF89a".to_vec())
            .await;

        assert_eq!(res.status, 422, "{}", res.text);
        assert_eq!(
            res.body,
            json!({"error": {"grenadeImage_extension": "file extension must be jpeg|jpg|png"}})
        );
        assert!(app.stored_objects().is_empty());
    }

    #[tokio::test]
    async fn file_of_twenty_megabytes_is_rejected() {
        let app = TestApp::spawn().await;
        let grenade_id = app.create_grenade("dust2", "smoke", "CT").await;

        let res = app
            .upload(
                &routes::grenade_images(grenade_id),
                "huge.jpg",
                vec![0u8; 20_000_000],
            )
            .await;

        assert_eq!(res.status, 422, "{}", res.text);
        assert_eq!(
            res.body["error"]["grenadeImage_size"],
            "file size must be less than 20MB"
        );
        assert!(app.stored_objects().is_empty());
    }

    #[tokio::test]
    async fn file_past_the_request_ceiling_is_a_size_error() {
        let app = TestApp::spawn().await;
        let grenade_id = app.create_grenade("dust2", "smoke", "CT").await;

        let res = app
            .upload(
                &routes::grenade_images(grenade_id),
                "big.png",
                vec![0u8; 33 * 1024 * 1024],
            )
            .await;

        assert_eq!(res.status, 422, "{}", res.text);
        assert_eq!(
            res.body["error"]["grenadeImage_size"],
            "file size must be less than 20MB"
        );
        assert!(app.stored_objects().is_empty());
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let app = TestApp::spawn().await;
        let grenade_id = app.create_grenade("dust2", "smoke", "CT").await;

        let res = app
            .upload_field(
                &routes::grenade_images(grenade_id),
                "file",
                "lineup.png",
                PNG_BYTES.to_vec(),
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
    }

    #[tokio::test]
    async fn upload_to_missing_grenade_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(&routes::grenade_images(404), "lineup.png", PNG_BYTES.to_vec())
            .await;

        assert_eq!(res.status, 404);
        assert!(app.stored_objects().is_empty());
    }
}

mod read {
    use super::*;

    #[tokio::test]
    async fn patched_grenade_keeps_its_images() {
        let app = TestApp::spawn().await;
        let grenade_id = app.create_grenade("inferno", "molotov", "T").await;
        let image = app.upload_image(grenade_id, "a.png", PNG_BYTES).await;

        let res = app
            .patch_json(
                &routes::grenade(grenade_id),
                &json!({"title": "Molly banana"}),
                None,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["grenade"]["images"], json!([image]));
    }

    #[tokio::test]
    async fn grenade_includes_its_images() {
        let app = TestApp::spawn().await;
        let grenade_id = app.create_grenade("nuke", "smoke", "CT").await;
        let first = app.upload_image(grenade_id, "a.png", PNG_BYTES).await;
        let second = app.upload_image(grenade_id, "b.jpeg", b"jpeg").await;

        let res = app.get(&routes::grenade(grenade_id)).await;

        assert_eq!(res.status, 200);
        let images = res.body["grenade"]["images"].as_array().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0], first);
        assert_eq!(images[1], second);
    }

    #[tokio::test]
    async fn listing_enriches_every_grenade() {
        let app = TestApp::spawn().await;
        let with_image = app.create_grenade("nuke", "smoke", "CT").await;
        app.create_grenade("nuke", "flash", "T").await;
        app.upload_image(with_image, "a.jpg", b"jpg").await;

        let res = app.get("/v1/grenades?sort=id").await;

        let grenades = res.body["grenades"].as_array().unwrap();
        assert_eq!(grenades.len(), 2);
        assert_eq!(grenades[0]["images"].as_array().unwrap().len(), 1);
        assert!(grenades[1].get("images").is_none());
    }

    #[tokio::test]
    async fn image_metadata_endpoints() {
        let app = TestApp::spawn().await;
        let grenade_id = app.create_grenade("overpass", "molotov", "T").await;
        let image = app.upload_image(grenade_id, "a.png", PNG_BYTES).await;
        let id = image["id"].as_i64().unwrap();

        let single = app.get(&routes::image(id)).await;
        assert_eq!(single.status, 200);
        assert_eq!(single.body["image"], image);

        let all = app.get(routes::IMAGES).await;
        assert_eq!(all.body["images"], json!([image]));

        assert_eq!(app.get(&routes::image(id + 100)).await.status, 404);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deleting_an_image_removes_its_file() {
        let app = TestApp::spawn().await;
        let grenade_id = app.create_grenade("vertigo", "he", "CT").await;
        let image = app.upload_image(grenade_id, "a.png", PNG_BYTES).await;
        let id = image["id"].as_i64().unwrap();

        let res = app.delete(&routes::image(id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!({"message": "image successfully deleted"}));

        assert!(app.stored_objects().is_empty());
        assert_eq!(app.get(&routes::image(id)).await.status, 404);
        assert_eq!(app.delete(&routes::image(id)).await.status, 404);
    }

    #[tokio::test]
    async fn deleting_a_grenade_removes_all_its_images() {
        let app = TestApp::spawn().await;
        let doomed = app.create_grenade("ancient", "smoke", "T").await;
        let survivor = app.create_grenade("ancient", "flash", "T").await;
        let a = app.upload_image(doomed, "a.png", PNG_BYTES).await;
        let b = app.upload_image(doomed, "b.jpg", b"jpg").await;
        let kept = app.upload_image(survivor, "c.png", PNG_BYTES).await;

        let res = app.delete(&routes::grenade(doomed)).await;
        assert_eq!(res.status, 200, "{}", res.text);

        for image in [&a, &b] {
            let id = image["id"].as_i64().unwrap();
            assert_eq!(app.get(&routes::image(id)).await.status, 404);
        }
        assert_eq!(
            app.stored_objects(),
            vec![kept["name"].as_str().unwrap().to_string()]
        );
    }
}
