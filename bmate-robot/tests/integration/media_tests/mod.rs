mod test_media_unavailable;
